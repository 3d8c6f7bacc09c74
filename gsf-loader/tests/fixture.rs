use std::sync::OnceLock;

pub use gsf_hosting::host::mock::{MockBehavior, MockHost};
use gsf_hosting::RuntimeBridge;

/// Installs a mock-backed process-wide bridge on first use. Every test in one
/// binary shares it, so only the first caller's behavior counts.
#[allow(dead_code)]
pub fn global_mock(behavior: MockBehavior) -> &'static MockHost {
    static MOCK: OnceLock<MockHost> = OnceLock::new();

    MOCK.get_or_init(|| {
        init_tracing();
        let mock = MockHost::new(behavior);
        RuntimeBridge::install_global(mock.bridge())
            .expect("process-wide bridge was built before the fixture");
        mock
    })
}

#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}
