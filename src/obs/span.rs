// crates.io
use tracing::{Instrument, instrument::Instrumented};
use tracing_subscriber::{
	EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError,
};
// self
use crate::{_prelude::*, obs::FlowKind};

/// Installs the global subscriber: `RUST_LOG` filtering (default `info`) and a formatter that
/// writes to stderr, leaving stdout to the MCP protocol.
pub fn init_tracing() -> Result<(), TryInitError> {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::registry()
		.with(filter)
		.with(fmt::layer().with_writer(std::io::stderr).with_target(false))
		.try_init()
}

/// Span wrapper shared by the crate's flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		Self { span: tracing::info_span!("x_mcp.flow", flow = kind.as_str(), stage) }
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> FlowSpanGuard {
		FlowSpanGuard { _guard: self.span.entered() }
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		fut.instrument(self.span.clone())
	}
}

/// RAII guard returned by [`FlowSpan::entered`].
pub struct FlowSpanGuard {
	_guard: tracing::span::EnteredSpan,
}
impl Debug for FlowSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FlowSpanGuard(..)")
	}
}
