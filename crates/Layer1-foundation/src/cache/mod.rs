//! Cache - `TagCache` 구현
//!
//! 호스트가 공유 캐시를 주입하지 않을 때 쓸 수 있는 프로세스 내 캐시입니다.

mod memory;

pub use memory::{MemoryCache, MemoryCacheConfig};
