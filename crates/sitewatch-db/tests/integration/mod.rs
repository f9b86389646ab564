mod common;
mod mail_tests;
mod pipeline_tests;
mod post_tests;
mod site_tests;
