//! Execution of CREATE DATABASE, CREATE TABLE and CREATE INDEX.
//!
//! A statement is planned by [`planner::Planner::plan`], which performs only
//! read-only checks, and then started via [`create::PlanNode::start`], which
//! builds, links and publishes descriptors inside the planner's transaction.

pub mod ast;
pub mod builder;
pub mod create;
pub mod executor;
pub mod foreign_key;
pub mod interleave;
pub mod planner;
pub mod publish;
