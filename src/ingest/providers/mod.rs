pub mod reddit_rss;
