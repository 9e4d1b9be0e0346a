//! External collaborators: the on-chain ledger and the user's wallet.

pub mod address;
pub mod operation;
mod traits;

pub use address::{mask, LedgerAddress, ADDRESS_LEN};
pub use operation::{
    Commitment, Instruction, Signature, SignedOperation, SubmitOptions, UnsignedOperation,
};
pub use traits::{LedgerClient, LedgerClientError, Wallet, WalletError};
