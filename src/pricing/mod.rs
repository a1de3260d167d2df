pub mod electricity_price;
