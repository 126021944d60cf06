//! Unit and orchestration tests for the task lifecycle.

mod cancel_overdue_tests;
mod create_flow_tests;
mod domain_tests;
mod flow_error_tests;
mod helpers;
mod money_tests;
mod review_flow_tests;
mod status_transition_tests;
