// Storefront
pub mod checkout;
pub mod orders;
pub mod products;
pub mod settings;

// Back office
pub mod coupons;
pub mod dashboard;
