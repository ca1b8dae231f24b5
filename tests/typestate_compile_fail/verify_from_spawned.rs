/// This test should FAIL to compile
/// Verifying without a launched container should be impossible

use ocicheck::config::types::HarnessConfig;
use ocicheck::exec::spawner::UnshareSpawner;
use ocicheck::kernel::namespace::{NamespaceKind, ProcNamespaceResolver};
use ocicheck::testing::ns_path::NsCheck;

fn main() {
    let config = HarnessConfig::default();
    let resolver = ProcNamespaceResolver;
    let spawner = UnshareSpawner::from_config(&config);

    let check = NsCheck::new(NamespaceKind::Network)
        .spawn(&resolver, &spawner)
        .expect("spawn failed");

    // This should fail: Spawned doesn't have verify method
    let _ = check.verify();
}
