use std::backtrace::Backtrace;
use std::fmt;
use std::panic::Location;

/// Where a callback object was handed to the other side.
///
/// Kept only so that a leaked callback can be traced back to the code that
/// registered it.
#[derive(Clone, Debug)]
pub struct RegistrationSite {
	location: &'static Location<'static>,
	backtrace: Option<String>,
}

impl RegistrationSite {
	/// Captures the caller's location, and a backtrace if requested.
	#[track_caller]
	pub fn capture(backtrace: bool) -> Self {
		Self {
			location: Location::caller(),
			backtrace: backtrace.then(|| Backtrace::force_capture().to_string()),
		}
	}

	pub fn location(&self) -> &'static Location<'static> {
		self.location
	}

	pub fn backtrace(&self) -> Option<&str> {
		self.backtrace.as_deref()
	}
}

impl fmt::Display for RegistrationSite {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "registered at {}", self.location)?;
		if let Some(backtrace) = &self.backtrace {
			write!(f, "\n{backtrace}")?;
		}
		Ok(())
	}
}
