// Host bridge: the command surface the engine is driven through and the
// channel its notifications leave by.

mod stdio;

pub use stdio::run_stdio_bridge;
