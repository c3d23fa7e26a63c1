// Configuration modules for the phishing detector

pub mod watchlists;

pub use watchlists::Watchlists;
