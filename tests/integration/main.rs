mod crawl_tests;
mod index_tests;
