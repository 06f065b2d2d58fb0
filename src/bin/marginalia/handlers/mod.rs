pub mod books;
pub mod browse;
pub mod notes;
pub mod tags;
