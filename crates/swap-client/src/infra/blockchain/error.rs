use {
    crate::domain::eth,
    alloy::{
        contract::Error as ContractError,
        providers::PendingTransactionError,
        transports::{RpcError, TransportError},
    },
    thiserror::Error,
};

/// EIP-1193 error code for a request the user refused to sign.
///
/// https://eips.ethereum.org/EIPS/eip-1193#provider-errors
const USER_REJECTED: i64 = 4001;

#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The signer refused the request.
    #[error("rejected by the signer: {0}")]
    Rejected(String),
    /// The transaction was included but reverted.
    #[error("transaction {0} reverted")]
    Reverted(eth::TxId),
    /// A call reverted or returned data that could not be decoded.
    #[error("contract error: {0}")]
    Contract(String),
    /// The node could not be reached or returned an error unrelated to the
    /// call itself.
    #[error("node error: {0}")]
    Node(String),
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        match &err {
            RpcError::ErrorResp(payload) if payload.code == USER_REJECTED => {
                Self::Rejected(payload.message.to_string())
            }
            // Signing happens locally before anything is sent to the node.
            RpcError::LocalUsageError(_) => Self::Rejected(err.to_string()),
            // Reverts come back as error responses carrying revert data.
            RpcError::ErrorResp(payload) if payload.as_revert_data().is_some() => {
                Self::Contract(err.to_string())
            }
            _ => Self::Node(err.to_string()),
        }
    }
}

impl From<ContractError> for Error {
    fn from(err: ContractError) -> Self {
        match err {
            ContractError::TransportError(err) => err.into(),
            err => Self::Contract(err.to_string()),
        }
    }
}

impl From<PendingTransactionError> for Error {
    fn from(err: PendingTransactionError) -> Self {
        match err {
            PendingTransactionError::TransportError(err) => err.into(),
            err => Self::Node(err.to_string()),
        }
    }
}
