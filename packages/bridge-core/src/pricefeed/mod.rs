pub mod pricefeed;
