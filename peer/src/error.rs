use crate::session::Phase;
use shared::Role;
use thiserror::Error;

/// A message or local action that does not fit the current session state.
///
/// These never end a session: the message handler logs them and stays in
/// its current phase.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("'{message}' is not expected while {phase}")]
    UnexpectedMessage { message: &'static str, phase: Phase },

    #[error("'{message}' is not accepted by the {role}")]
    WrongRole { message: &'static str, role: Role },

    #[error("'{message}' is only exchanged with the relay")]
    RelayOnly { message: &'static str },

    #[error("cannot {action} while {phase}")]
    InvalidAction { action: &'static str, phase: Phase },
}
