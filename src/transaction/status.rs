//! Response status codes returned by consensus nodes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How the execution engine treats a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// Accepted; stop and return.
    Success,
    /// Transient; back off and try another node.
    Retryable,
    /// Permanent; stop and surface the status.
    Fatal,
}

macro_rules! statuses {
    ($($name:ident = $code:literal,)+) => {
        /// A node response code. Codes without a name are kept as `Other`.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "i32", into = "i32")]
        pub enum Status {
            $($name,)+
            Other(i32),
        }

        impl Status {
            pub fn from_code(code: i32) -> Self {
                match code {
                    $($code => Status::$name,)+
                    other => Status::Other(other),
                }
            }

            pub fn code(&self) -> i32 {
                match self {
                    $(Status::$name => $code,)+
                    Status::Other(code) => *code,
                }
            }

            pub fn name(&self) -> Option<&'static str> {
                match self {
                    $(Status::$name => Some(stringify!($name)),)+
                    Status::Other(_) => None,
                }
            }
        }
    };
}

statuses! {
    Ok = 0,
    InvalidTransaction = 1,
    PayerAccountNotFound = 2,
    InvalidNodeAccount = 3,
    TransactionExpired = 4,
    InvalidTransactionStart = 5,
    InvalidTransactionDuration = 6,
    InvalidSignature = 7,
    MemoTooLong = 8,
    InsufficientTxFee = 9,
    InsufficientPayerBalance = 10,
    DuplicateTransaction = 11,
    Busy = 12,
    NotSupported = 13,
    InvalidFileId = 14,
    InvalidAccountId = 15,
    InvalidContractId = 16,
    InvalidTransactionId = 17,
    ReceiptNotFound = 18,
    RecordNotFound = 19,
    InvalidSolidityId = 20,
    Unknown = 21,
    Success = 22,
    FailInvalid = 23,
    FailFee = 24,
    FailBalance = 25,
    KeyRequired = 26,
    BadEncoding = 27,
    InsufficientAccountBalance = 28,
    InvalidSolidityAddress = 29,
    InsufficientGas = 30,
    ContractSizeLimitExceeded = 31,
    LocalCallModificationException = 32,
    ContractRevertExecuted = 33,
    ContractExecutionException = 34,
    InvalidReceivingNodeAccount = 35,
    MissingQueryHeader = 36,
    AccountUpdateFailed = 37,
    InvalidKeyEncoding = 38,
    NullSolidityAddress = 39,
    ContractUpdateFailed = 40,
    InvalidQueryHeader = 41,
    InvalidFeeSubmitted = 42,
    InvalidPayerSignature = 43,
    KeyNotProvided = 44,
    InvalidExpirationTime = 45,
    NoWaclKey = 46,
    FileContentEmpty = 47,
    InvalidAccountAmounts = 48,
    EmptyTransactionBody = 49,
    InvalidTransactionBody = 50,
    InvalidSignatureTypeMismatchingKey = 51,
    InvalidSignatureCountMismatchingKey = 52,
    EmptyClaimBody = 53,
    EmptyClaimHash = 54,
    EmptyClaimKeys = 55,
    InvalidClaimHashSize = 56,
    EmptyQueryBody = 57,
    EmptyClaimQuery = 58,
    ClaimNotFound = 59,
    AccountIdDoesNotExist = 60,
    ClaimAlreadyExists = 61,
    InvalidFileWacl = 62,
    SerializationFailed = 63,
    TransactionOversize = 64,
    TransactionTooManyLayers = 65,
    ContractDeleted = 66,
    PlatformNotActive = 67,
    KeyPrefixMismatch = 68,
    PlatformTransactionNotCreated = 69,
    InvalidRenewalPeriod = 70,
    InvalidPayerAccountId = 71,
    AccountDeleted = 72,
}

impl Status {
    pub fn classify(&self) -> StatusClass {
        match self {
            Status::Ok | Status::Success => StatusClass::Success,
            Status::Busy
            | Status::Unknown
            | Status::PlatformTransactionNotCreated
            | Status::PlatformNotActive => StatusClass::Retryable,
            _ => StatusClass::Fatal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.classify() == StatusClass::Retryable
    }
}

impl From<i32> for Status {
    fn from(code: i32) -> Self {
        Status::from_code(code)
    }
}

impl From<Status> for i32 {
    fn from(status: Status) -> Self {
        status.code()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "Status({})", self.code()),
        }
    }
}
