//! Presentation layer of the dashboard.
//!
//! Every page is a plain data model: the state a page holds, the transitions
//! its controls trigger, and the strings it displays. Front-ends (the CLI, or
//! any renderer) drive these models and draw them however they like.

pub mod panels;
