use crate::{
	message::{Message, ValidationError},
	transport::{DeliveryResult, Transport},
};

/// Turns a [`Message`] into the header-block-and-body text a transport
/// wants and drives the [`Transport`] it owns. Stateless per call; the
/// result of one send says nothing about the next.
pub struct Dispatcher {
	transport: Transport,
}

impl Dispatcher {
	pub fn new(transport: Transport) -> Self {
		Self { transport }
	}

	/// Validate, format, deliver. A validation failure comes back as
	/// `Err` before anything is spawned; once the transport runs, its
	/// outcome is passed through untouched, with no retry.
	pub async fn send(&self, message: &Message) -> Result<DeliveryResult, ValidationError> {
		message.validate()?;

		let headers = header_block(message);
		Ok(self.transport.deliver(&headers, &message.body).await)
	}
}

// The header order is load-bearing: From, To, Cc (only when there are
// cc recipients), Subject. Transports that line-scan rely on it.
// Addresses are joined in the order given, duplicates and all.
fn header_block(message: &Message) -> String {
	let mut block = format!("From: {}\nTo: {}", message.sender, message.to.join(","));

	if !message.cc.is_empty() {
		block.push_str("\nCc: ");
		block.push_str(&message.cc.join(","));
	}

	block.push_str("\nSubject: ");
	block.push_str(&message.subject);

	block
}

#[cfg(test)]
mod test {
	use std::{os::unix::fs::PermissionsExt, path::PathBuf, time::Duration};

	use tempfile::TempDir;

	use super::*;

	fn message() -> Message {
		Message {
			sender: "a@x.com".into(),
			to: vec!["b@x.com".into()],
			cc: vec![],
			subject: "Hi".into(),
			body: "Hello".into(),
		}
	}

	/// A transport that copies its stdin to the file it's given, so a
	/// test can see exactly what would have gone out.
	fn recording_transport(dir: &TempDir) -> (Transport, PathBuf) {
		let script = dir.path().join("record.sh");
		let outfile = dir.path().join("captured");

		std::fs::write(&script, "#!/bin/sh\ncat - > \"$1\"\n").unwrap();
		std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

		let mut transport = Transport::new(Some(script.to_string_lossy().into_owned()));
		transport.set_args([outfile.to_string_lossy().into_owned()]);
		transport.set_timeout(Duration::from_secs(5));

		(transport, outfile)
	}

	#[test]
	fn header_block_skips_empty_cc() {
		assert_eq!(
			header_block(&message()),
			"From: a@x.com\nTo: b@x.com\nSubject: Hi"
		);
	}

	#[test]
	fn header_block_cc_follows_to() {
		let mut msg = message();
		msg.cc = vec!["c@x.com".into(), "d@x.com".into()];

		assert_eq!(
			header_block(&msg),
			"From: a@x.com\nTo: b@x.com\nCc: c@x.com,d@x.com\nSubject: Hi"
		);
	}

	#[test]
	fn header_block_keeps_order_and_duplicates() {
		let mut msg = message();
		msg.to = vec!["z@x.com".into(), "b@x.com".into(), "z@x.com".into()];

		assert_eq!(
			header_block(&msg),
			"From: a@x.com\nTo: z@x.com,b@x.com,z@x.com\nSubject: Hi"
		);
	}

	#[tokio::test]
	async fn sent_message_arrives_verbatim() {
		let dir = TempDir::new().unwrap();
		let (transport, outfile) = recording_transport(&dir);

		let result = Dispatcher::new(transport).send(&message()).await.unwrap();
		assert!(result.is_delivered());

		assert_eq!(
			std::fs::read_to_string(&outfile).unwrap(),
			"From: a@x.com\nTo: b@x.com\nSubject: Hi\n\nHello"
		);
	}

	#[tokio::test]
	async fn cc_recipients_ride_along() {
		let dir = TempDir::new().unwrap();
		let (transport, outfile) = recording_transport(&dir);

		let mut msg = message();
		msg.cc = vec!["c@x.com".into(), "d@x.com".into()];

		let result = Dispatcher::new(transport).send(&msg).await.unwrap();
		assert!(result.is_delivered());

		assert_eq!(
			std::fs::read_to_string(&outfile).unwrap(),
			"From: a@x.com\nTo: b@x.com\nCc: c@x.com,d@x.com\nSubject: Hi\n\nHello"
		);
	}

	#[tokio::test]
	async fn invalid_message_never_spawns() {
		let dir = TempDir::new().unwrap();
		let (transport, outfile) = recording_transport(&dir);

		let mut msg = message();
		msg.to.clear();

		let result = Dispatcher::new(transport).send(&msg).await;
		assert_eq!(result.unwrap_err(), ValidationError::NoRecipients);

		// the recording script was never run
		assert!(!outfile.exists());
	}

	#[tokio::test]
	async fn body_passes_through_untouched() {
		let dir = TempDir::new().unwrap();
		let (transport, outfile) = recording_transport(&dir);

		let mut msg = message();
		msg.body = "line one\n  indented, not rewrapped\t\nline three\n".into();

		Dispatcher::new(transport).send(&msg).await.unwrap();

		assert_eq!(
			std::fs::read_to_string(&outfile).unwrap(),
			"From: a@x.com\nTo: b@x.com\nSubject: Hi\n\nline one\n  indented, not rewrapped\t\nline three\n"
		);
	}
}
