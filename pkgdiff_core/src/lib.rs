pub mod checksum;
pub mod classifier;
pub mod comparator;
pub mod diff_render;
pub mod reporter;
pub mod verify;

pub use checksum::ChecksumProvider;
pub use classifier::{ContentClassifier, SniffingClassifier};
pub use comparator::TreeComparator;
pub use diff_render::DiffRenderer;
pub use reporter::{ReportSummary, Reporter};
pub use verify::{
    BaselineAcquirer, InstalledPackage, PackageResolver, ScratchLifecycle, TempScratch, Verifier,
    VerifyOutcome, VersionSpec,
};
