pub mod chat_pipeline_test;
