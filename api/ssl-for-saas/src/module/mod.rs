pub mod ssl_job;
