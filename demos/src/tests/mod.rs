mod exposure;
mod registers;
mod test_runner;

pub use test_runner::run;
