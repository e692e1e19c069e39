use thiserror::Error;

/// A single outgoing message. Built by the caller per send and thrown
/// away once the send returns; nothing here is persisted.
#[derive(Debug, Clone)]
pub struct Message {
	pub sender: String,
	pub to: Vec<String>,
	pub cc: Vec<String>,
	pub subject: String,
	pub body: String,
}

impl Message {
	/// Check the invariants the dispatcher relies on: a sender, at least
	/// one To recipient, and no empty address anywhere. Addresses are
	/// otherwise taken as given; the caller validated them already.
	pub fn validate(&self) -> Result<(), ValidationError> {
		if self.sender.is_empty() {
			return Err(ValidationError::EmptySender);
		}

		if self.to.is_empty() {
			return Err(ValidationError::NoRecipients);
		}

		if self.to.iter().chain(self.cc.iter()).any(|addr| addr.is_empty()) {
			return Err(ValidationError::EmptyAddress);
		}

		Ok(())
	}
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
	#[error("the sender address is empty")]
	EmptySender,
	#[error("the message has no To recipients")]
	NoRecipients,
	#[error("a recipient address is an empty string")]
	EmptyAddress,
}
