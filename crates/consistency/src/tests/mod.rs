//! Harness tests against an in-memory devnet

mod support;

mod forwarding_test;
