pub mod aqar;
pub mod browser;
pub mod extract;
pub mod pool;
pub mod traits;
pub mod types;

pub use aqar::Crawler;
pub use browser::ChromeSessionFactory;
pub use pool::PagePool;
