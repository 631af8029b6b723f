//! Verification-state derivation for the identity banner.
//!
//! This only drives a visual indicator; the remote API enforces anything that
//! actually depends on verification.

use super::models::{Identity, PhoneVerificationStatus};

/// Email verified and phone verification not outstanding.
///
/// A missing email flag, a pending phone check, or a phone status the client
/// does not recognise all count as unverified.
pub fn is_fully_verified(identity: &Identity) -> bool {
    let email_ok = identity.email_verified == Some(true);
    let phone_ok = matches!(
        identity.phone_verification_status,
        None | Some(PhoneVerificationStatus::NotStarted) | Some(PhoneVerificationStatus::Verified)
    );
    email_ok && phone_ok
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(
        email_verified: Option<bool>,
        phone: Option<PhoneVerificationStatus>,
    ) -> Identity {
        Identity {
            email_verified,
            phone_verification_status: phone,
            ..Identity::default()
        }
    }

    #[test]
    fn verified_email_and_phone() {
        assert!(is_fully_verified(&identity(
            Some(true),
            Some(PhoneVerificationStatus::Verified)
        )));
    }

    #[test]
    fn pending_phone_is_not_verified() {
        assert!(!is_fully_verified(&identity(
            Some(true),
            Some(PhoneVerificationStatus::Pending)
        )));
    }

    #[test]
    fn empty_identity_is_not_verified() {
        assert!(!is_fully_verified(&Identity::default()));
    }

    #[test]
    fn absent_or_unstarted_phone_check_does_not_block() {
        assert!(is_fully_verified(&identity(Some(true), None)));
        assert!(is_fully_verified(&identity(
            Some(true),
            Some(PhoneVerificationStatus::NotStarted)
        )));
    }

    #[test]
    fn unverified_email_blocks_regardless_of_phone() {
        assert!(!is_fully_verified(&identity(
            Some(false),
            Some(PhoneVerificationStatus::Verified)
        )));
        assert!(!is_fully_verified(&identity(None, None)));
    }

    #[test]
    fn unknown_phone_status_is_not_verified() {
        assert!(!is_fully_verified(&identity(
            Some(true),
            Some(PhoneVerificationStatus::Unknown)
        )));
    }
}
