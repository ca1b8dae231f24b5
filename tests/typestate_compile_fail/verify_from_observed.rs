/// This test should FAIL to compile
/// Skipping the runtime launch should be impossible

use ocicheck::config::types::HarnessConfig;
use ocicheck::exec::spawner::UnshareSpawner;
use ocicheck::kernel::namespace::{NamespaceKind, ProcNamespaceResolver};
use ocicheck::kernel::poll::PollSettings;
use ocicheck::testing::ns_path::NsCheck;

fn main() {
    let config = HarnessConfig::default();
    let resolver = ProcNamespaceResolver;
    let spawner = UnshareSpawner::from_config(&config);

    let check = NsCheck::new(NamespaceKind::Mount)
        .spawn(&resolver, &spawner)
        .expect("spawn failed")
        .observe(&resolver, PollSettings::default())
        .expect("observe failed");

    // This should fail: NamespaceObserved doesn't have verify method
    let _ = check.verify();
}
