/// This test should FAIL to compile
/// Observing a namespace before any placeholder is spawned should be impossible

use ocicheck::kernel::namespace::{NamespaceKind, ProcNamespaceResolver};
use ocicheck::kernel::poll::PollSettings;
use ocicheck::testing::ns_path::NsCheck;

fn main() {
    let check = NsCheck::new(NamespaceKind::Uts);

    // This should fail: Unspawned doesn't have observe method
    let _ = check.observe(&ProcNamespaceResolver, PollSettings::default());
}
