/// This test should FAIL to compile
/// Launching the runtime before the isolated namespace is observed should be impossible

use ocicheck::config::types::{HarnessConfig, IdMapping};
use ocicheck::exec::spawner::UnshareSpawner;
use ocicheck::kernel::namespace::{NamespaceKind, ProcNamespaceResolver};
use ocicheck::runtime::launcher::OciRuntime;
use ocicheck::testing::ns_path::NsCheck;

fn main() {
    let config = HarnessConfig::default();
    let resolver = ProcNamespaceResolver;
    let spawner = UnshareSpawner::from_config(&config);
    let runtime = OciRuntime::from_config(&config);

    let check = NsCheck::new(NamespaceKind::Ipc)
        .spawn(&resolver, &spawner)
        .expect("spawn failed");

    // This should fail: Spawned doesn't have launch method
    let _ = check.launch(&resolver, &runtime, IdMapping::default());
}
