use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(BloodType {
    APositive => "A+",
    ANegative => "A-",
    BPositive => "B+",
    BNegative => "B-",
    AbPositive => "AB+",
    AbNegative => "AB-",
    OPositive => "O+",
    ONegative => "O-",
});

str_enum!(Priority {
    Emergency => "Emergency",
    Urgent => "Urgent",
    Routine => "Routine",
});

impl Priority {
    /// Listing rank: Emergency surfaces before Urgent before Routine.
    /// Matches the ordering CASE in the request queries (unknown values rank 4).
    pub fn rank(&self) -> i32 {
        match self {
            Self::Emergency => 1,
            Self::Urgent => 2,
            Self::Routine => 3,
        }
    }
}

str_enum!(RequestStatus {
    Pending => "Pending",
    PendingCrossmatch => "Pending_Crossmatch",
    EscalatedToDonors => "Escalated_To_Donors",
    Allocated => "Allocated",
    Issued => "Issued",
    Fulfilled => "Fulfilled",
    PartiallyFulfilled => "Partially_Fulfilled",
    CancelledByHospital => "Cancelled_By_Hospital",
    RejectedByBloodbank => "Rejected_By_Bloodbank",
});

impl RequestStatus {
    /// Terminal statuses admit no further workflow transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Fulfilled | Self::CancelledByHospital | Self::RejectedByBloodbank
        )
    }
}

str_enum!(BagStatus {
    PendingTesting => "Pending Testing",
    Available => "Available",
    Reserved => "Reserved",
    Crossmatched => "Crossmatched",
    Issued => "Issued",
    Used => "Used",
    Discarded => "Discarded",
});

str_enum!(Role {
    Donor => "donor",
    BloodBankStaff => "blood_bank_staff",
    HospitalStaff => "hospital_staff",
});

str_enum!(LinkState {
    Reserved => "Reserved",
    Crossmatched => "Crossmatched",
    Issued => "Issued",
    Used => "Used",
    Released => "Released",
});

impl LinkState {
    /// Active links bind the bag to exactly one request.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Reserved | Self::Crossmatched | Self::Issued)
    }
}
