pub mod news_handlers;
