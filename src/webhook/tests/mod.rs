//! Unit and behavioural tests for webhook ingestion.

mod signature_tests;
