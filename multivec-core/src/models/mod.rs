pub mod chromosome;
pub mod interval;
pub mod track;

// re-export for cleaner imports
pub use self::chromosome::{Chromosome, ChromosomeOrder};
pub use self::interval::SignalInterval;
pub use self::track::{IntervalIter, MemoryTrack, SignalTrack};
