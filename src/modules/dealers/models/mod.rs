pub mod dealer;

pub use dealer::Dealer;
