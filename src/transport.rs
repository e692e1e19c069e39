use std::{fmt, process::Stdio, str::FromStr, time::Duration};

use thiserror::Error;
use tokio::{io::AsyncWriteExt, process::Command, time::timeout};
use tracing::{debug, warn};

/// The conventional transport on basically every unix. Resolved through
/// normal process execution; we never search for it ourselves.
pub const DEFAULT_BINARY: &str = "sendmail";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// The known argument profiles. Each type maps to the default argument
/// list its transport binary wants; the set is closed and only grows by
/// adding variants here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportType {
	/// A standards-compliant transport that takes `-t` and reads the
	/// envelope recipients back out of the header block.
	Sendmail,
	/// catchmail and friends, which capture mail for inspection instead
	/// of delivering it. No arguments; it just eats stdin.
	Catchmail,
}

impl TransportType {
	/// Every recognized type, for the calling layer's help text.
	pub const ALL: [TransportType; 2] = [TransportType::Sendmail, TransportType::Catchmail];

	fn default_args(self) -> &'static [&'static str] {
		match self {
			TransportType::Sendmail => &["-t"],
			TransportType::Catchmail => &[],
		}
	}
}

impl fmt::Display for TransportType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TransportType::Sendmail => write!(f, "sendmail"),
			TransportType::Catchmail => write!(f, "catchmail"),
		}
	}
}

impl FromStr for TransportType {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"sendmail" => Ok(TransportType::Sendmail),
			"catchmail" => Ok(TransportType::Catchmail),
			_ => Err(ConfigError::UnknownType(s.to_string())),
		}
	}
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
	#[error("unrecognized transport type \"{0}\"")]
	UnknownType(String),
}

/// What came of a deliver call. Failures are data, not panics, so the
/// caller can tell "could not attempt delivery" from "the transport
/// rejected it" and pick an exit code.
#[derive(Debug)]
pub enum DeliveryResult {
	Delivered,
	Failed(FailureReason),
}

impl DeliveryResult {
	pub fn is_delivered(&self) -> bool {
		matches!(self, DeliveryResult::Delivered)
	}
}

#[derive(Debug, Error)]
pub enum FailureReason {
	#[error("transport binary not found: {0}")]
	NotFound(String),
	#[error("failed writing the message to the transport")]
	Io(#[from] std::io::Error),
	#[error("transport did not exit within {0:?}")]
	Timeout(Duration),
	#[error("transport exited with status {0}")]
	NonZeroExit(i32),
}

/// Hands a formatted message to a local transport binary over stdin.
///
/// Configured once and immutable after that; `deliver` takes `&self`
/// and keeps no cross-call state, so concurrent sends are fine.
pub struct Transport {
	binary: String,
	args: Vec<String>,
	timeout: Duration,
}

impl Transport {
	/// Bind to a transport binary, or [`DEFAULT_BINARY`] if `None`.
	/// Nothing is spawned or checked until the first deliver.
	pub fn new(binary: Option<String>) -> Self {
		Self {
			binary: binary.unwrap_or_else(|| DEFAULT_BINARY.to_string()),
			args: arg_vec(TransportType::Sendmail.default_args()),
			timeout: DEFAULT_TIMEOUT,
		}
	}

	/// Swap the argument list for `ttype`'s defaults. Last call wins.
	pub fn apply_type(&mut self, ttype: TransportType) {
		self.args = arg_vec(ttype.default_args());
	}

	/// [`apply_type`](Self::apply_type), but from a caller-supplied name.
	/// An unknown name errors and leaves the active profile alone.
	pub fn set_type(&mut self, name: &str) -> Result<(), ConfigError> {
		self.apply_type(TransportType::from_str(name)?);
		Ok(())
	}

	/// Replace the argument list outright. Explicit arguments take the
	/// place of the type defaults rather than appending to them.
	pub fn set_args<I, S>(&mut self, args: I)
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.args = args.into_iter().map(Into::into).collect();
	}

	pub fn set_timeout(&mut self, timeout: Duration) {
		self.timeout = timeout;
	}

	/// Spawn the transport, feed it `headers`, a blank line, and `body`
	/// on stdin, and wait for it to exit. stdin is closed on every path
	/// out of here so the child is never left waiting for more input; a
	/// child that outlives the timeout is killed.
	pub async fn deliver(&self, headers: &str, body: &str) -> DeliveryResult {
		let mut child = match Command::new(&self.binary)
			.args(&self.args)
			.stdin(Stdio::piped())
			.stdout(Stdio::null())
			.stderr(Stdio::null())
			.spawn()
		{
			Ok(child) => child,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
				return DeliveryResult::Failed(FailureReason::NotFound(self.binary.clone()))
			}
			Err(err) => return DeliveryResult::Failed(FailureReason::Io(err)),
		};

		debug!("spawned transport {} {}", self.binary, self.args.join(" "));

		let message = format!("{}\n\n{}", headers, body);

		// One deadline covers the whole conversation. A transport that
		// never reads its stdin stalls the write, not the wait, and has
		// to hit the timeout all the same.
		let run = async {
			let written = {
				let mut stdin = child.stdin.take().expect("stdin was piped above");
				stdin.write_all(message.as_bytes()).await
				// dropping stdin closes the pipe, the child sees end-of-input
			};

			if let Err(err) = written {
				// a partial message is worse than none; don't let the
				// transport act on one
				let _ = child.start_kill();
				let _ = child.wait().await;
				return DeliveryResult::Failed(FailureReason::Io(err));
			}

			match child.wait().await {
				Ok(status) if status.success() => DeliveryResult::Delivered,
				Ok(status) => {
					// no code means the transport died to a signal
					DeliveryResult::Failed(FailureReason::NonZeroExit(status.code().unwrap_or(-1)))
				}
				Err(err) => DeliveryResult::Failed(FailureReason::Io(err)),
			}
		};

		match timeout(self.timeout, run).await {
			Ok(result) => result,
			Err(_elapsed) => {
				warn!("transport {} hung, killing it", self.binary);
				let _ = child.start_kill();
				let _ = child.wait().await;
				DeliveryResult::Failed(FailureReason::Timeout(self.timeout))
			}
		}
	}
}

impl Default for Transport {
	fn default() -> Self {
		Self::new(None)
	}
}

fn arg_vec(args: &[&str]) -> Vec<String> {
	args.iter().map(|arg| arg.to_string()).collect()
}
