//! Stage instrumentation for the post-processing pipeline.
//!
//! Every stage (`decode`, `suppress`, `rescale`) opens one span tagged with
//! the stage name and batch size, and may report how many boxes it produced.
//! Built without the `tracing` feature, the span is a zero-sized guard and
//! the counts are never computed.

/// Opens an info span for pipeline stage `$stage` over `$batch` images,
/// with optional extra `key = value` fields.
#[cfg(feature = "tracing")]
macro_rules! stage_span {
    ($stage:literal, batch = $batch:expr $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::info_span!("stage", stage = $stage, batch = $batch $(, $key = $value)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! stage_span {
    ($stage:literal, batch = $batch:expr $(, $key:ident = $value:expr)* $(,)?) => {
        $crate::trace::DisabledSpan
    };
}

/// Reports the number of boxes of kind `$what` leaving a stage.
#[cfg(feature = "tracing")]
macro_rules! stage_count {
    ($what:literal, $count:expr) => {
        tracing::debug!(kind = $what, count = $count)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! stage_count {
    ($what:literal, $count:expr) => {
        ()
    };
}

pub(crate) use stage_count;
pub(crate) use stage_span;

/// Guard returned by `stage_span!` when tracing is compiled out.
#[cfg(not(feature = "tracing"))]
pub(crate) struct DisabledSpan;

#[cfg(not(feature = "tracing"))]
impl DisabledSpan {
    #[inline]
    pub(crate) fn entered(self) -> Self {
        self
    }
}
