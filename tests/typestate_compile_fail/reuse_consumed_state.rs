/// This test should FAIL to compile
/// Reusing a state after its transition consumed it should be impossible

use ocicheck::config::types::HarnessConfig;
use ocicheck::exec::spawner::UnshareSpawner;
use ocicheck::kernel::namespace::{NamespaceKind, ProcNamespaceResolver};
use ocicheck::kernel::poll::PollSettings;
use ocicheck::testing::ns_path::NsCheck;

fn main() {
    let config = HarnessConfig::default();
    let resolver = ProcNamespaceResolver;
    let spawner = UnshareSpawner::from_config(&config);

    let spawned = NsCheck::new(NamespaceKind::Pid)
        .spawn(&resolver, &spawner)
        .expect("spawn failed");

    let _observed = spawned.observe(&resolver, PollSettings::default());

    // This should fail: spawned was moved by observe
    let _ = spawned.session();
}
