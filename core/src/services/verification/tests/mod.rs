mod budget_tests;
mod channel_tests;
