use chrono::{DateTime, Duration, Utc};

use tierguard_core::{DomainError, DomainResult, IsolationContext, IsolationLevel};

use crate::credentials::{TokenValidationError, validate_token_window};
use crate::specification::Specification;
use crate::{Credential, CredentialType};

use super::{BusinessRule, RuleVerdict};

/// Input of [`CredentialValidationBusinessRule`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialValidationContext {
    pub credential: Credential,
    /// Context of the actor validating (usually presenting or updating) the credential.
    pub validator: IsolationContext,
    pub now: DateTime<Utc>,
}

impl CredentialValidationContext {
    fn window(&self, leeway: Duration) -> Option<Result<(), TokenValidationError>> {
        self.credential.expires_at.map(|expires_at| {
            validate_token_window(self.credential.issued_at, expires_at, self.now, leeway)
        })
    }
}

/// Type-specific shape constraints, plus ownership: the credential must
/// belong to the validating user.
///
/// Shape and ownership are evaluated independently so both failures are
/// reported together.
#[derive(Debug, Clone)]
pub struct CredentialValidationBusinessRule {
    password: Specification<CredentialValidationContext>,
    token: Specification<CredentialValidationContext>,
    api_key: Specification<CredentialValidationContext>,
    ownership: Specification<CredentialValidationContext>,
}

impl CredentialValidationBusinessRule {
    pub const NAME: &'static str = "credential_validation";

    pub fn new(leeway: Duration) -> Self {
        let password = Specification::leaf(
            "password_has_secret_hash",
            "password credential requires a secret hash",
            |ctx: &CredentialValidationContext| ctx.credential.has_secret_hash(),
        );

        let token = Specification::leaf(
            "token_has_reference",
            "token credential requires a token reference",
            |ctx: &CredentialValidationContext| ctx.credential.has_token_reference(),
        )
        .and(Specification::leaf(
            "token_has_expiry",
            "token credential has no expiry",
            |ctx: &CredentialValidationContext| ctx.credential.expires_at.is_some(),
        ))
        .and(Specification::leaf(
            "token_time_window",
            "token time window is invalid",
            move |ctx: &CredentialValidationContext| {
                ctx.window(leeway) != Some(Err(TokenValidationError::InvalidTimeWindow))
            },
        ))
        .and(Specification::leaf(
            "token_not_before",
            "token is not yet valid",
            move |ctx: &CredentialValidationContext| {
                ctx.window(leeway) != Some(Err(TokenValidationError::NotYetValid))
            },
        ))
        .and(Specification::leaf(
            "token_not_expired",
            "token has expired",
            move |ctx: &CredentialValidationContext| {
                ctx.window(leeway) != Some(Err(TokenValidationError::Expired))
            },
        ));

        let api_key = Specification::leaf(
            "api_key_has_secret_hash",
            "api key credential requires a secret hash",
            |ctx: &CredentialValidationContext| ctx.credential.has_secret_hash(),
        )
        .and(Specification::leaf(
            "api_key_not_expired",
            "api key has expired",
            move |ctx: &CredentialValidationContext| {
                let Some(expires_at) = ctx.credential.expires_at else {
                    return true;
                };
                ctx.now
                    .checked_sub_signed(leeway)
                    .is_none_or(|earliest| earliest < expires_at)
            },
        ));

        let ownership = Specification::leaf(
            "owner_is_validator",
            "credential owner does not match the validating actor",
            |ctx: &CredentialValidationContext| {
                ctx.validator.level() == IsolationLevel::User
                    && ctx.validator == ctx.credential.owner
            },
        );

        Self {
            password,
            token,
            api_key,
            ownership,
        }
    }

    fn shape(
        &self,
        credential_type: CredentialType,
    ) -> &Specification<CredentialValidationContext> {
        match credential_type {
            CredentialType::Password => &self.password,
            CredentialType::Token => &self.token,
            CredentialType::ApiKey => &self.api_key,
        }
    }
}

impl Default for CredentialValidationBusinessRule {
    fn default() -> Self {
        Self::new(Duration::zero())
    }
}

impl BusinessRule for CredentialValidationBusinessRule {
    type Context = CredentialValidationContext;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, context: &Self::Context) -> DomainResult<RuleVerdict> {
        let owner = &context.credential.owner;
        owner.validate()?;
        if owner.level() != IsolationLevel::User {
            return Err(DomainError::malformed_context(
                owner.level(),
                "credential owner must be a user-level context",
            ));
        }
        context.validator.validate()?;

        Ok(RuleVerdict::from_results(
            Self::NAME,
            [
                self.shape(context.credential.credential_type)
                    .is_satisfied_by(context),
                self.ownership.is_satisfied_by(context),
            ],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tierguard_core::IdentityCache;

    fn owner(cache: &IdentityCache, user: &str) -> IsolationContext {
        IsolationContext::user(
            cache.tenant("t1").unwrap(),
            cache.organization("o1").unwrap(),
            cache.department("d1").unwrap(),
            cache.user(user).unwrap(),
        )
    }

    fn check(
        credential: Credential,
        validator: IsolationContext,
        now: DateTime<Utc>,
    ) -> RuleVerdict {
        CredentialValidationBusinessRule::default()
            .validate(&CredentialValidationContext {
                credential,
                validator,
                now,
            })
            .unwrap()
    }

    #[test]
    fn password_with_hash_passes() {
        let cache = IdentityCache::new();
        let ctx = owner(&cache, "alice");
        let credential =
            Credential::password(cache.entity("c1").unwrap(), ctx.clone(), "$argon2id$v=19$abc");

        assert!(check(credential, ctx, Utc::now()).passed());
    }

    #[test]
    fn password_without_hash_fails() {
        let cache = IdentityCache::new();
        let ctx = owner(&cache, "alice");
        let credential = Credential::password(cache.entity("c1").unwrap(), ctx.clone(), "  ");

        let verdict = check(credential, ctx, Utc::now());
        assert_eq!(verdict.reasons(), vec!["password credential requires a secret hash"]);
    }

    #[test]
    fn expired_token_fails() {
        let cache = IdentityCache::new();
        let ctx = owner(&cache, "alice");
        let now = Utc::now();
        let credential = Credential::token(
            cache.entity("c1").unwrap(),
            ctx.clone(),
            "tok-ref-1",
            now - Duration::hours(2),
            now - Duration::hours(1),
        );

        assert_eq!(check(credential, ctx, now).reasons(), vec!["token has expired"]);
    }

    #[test]
    fn token_without_expiry_fails() {
        let cache = IdentityCache::new();
        let ctx = owner(&cache, "alice");
        let now = Utc::now();
        let mut credential = Credential::token(
            cache.entity("c1").unwrap(),
            ctx.clone(),
            "tok-ref-1",
            now,
            now + Duration::hours(1),
        );
        credential.expires_at = None;

        assert_eq!(check(credential, ctx, now).reasons(), vec!["token credential has no expiry"]);
    }

    #[test]
    fn valid_token_passes() {
        let cache = IdentityCache::new();
        let ctx = owner(&cache, "alice");
        let now = Utc::now();
        let credential = Credential::token(
            cache.entity("c1").unwrap(),
            ctx.clone(),
            "tok-ref-1",
            now - Duration::minutes(1),
            now + Duration::minutes(10),
        );

        assert!(check(credential, ctx, now).passed());
    }

    #[test]
    fn expired_api_key_fails() {
        let cache = IdentityCache::new();
        let ctx = owner(&cache, "alice");
        let now = Utc::now();
        let credential = Credential::api_key(cache.entity("k1").unwrap(), ctx.clone(), "sha256:abc")
            .expiring_at(now - Duration::days(1));

        assert_eq!(check(credential, ctx, now).reasons(), vec!["api key has expired"]);
    }

    #[test]
    fn api_key_with_huge_leeway_does_not_overflow() {
        let cache = IdentityCache::new();
        let ctx = owner(&cache, "alice");
        let now = Utc::now();
        let credential = Credential::api_key(cache.entity("k1").unwrap(), ctx.clone(), "sha256:abc")
            .expiring_at(now - Duration::days(1));

        let verdict = CredentialValidationBusinessRule::new(Duration::days(200_000_000))
            .validate(&CredentialValidationContext {
                credential,
                validator: ctx,
                now,
            })
            .unwrap();
        assert!(verdict.passed());
    }

    #[test]
    fn shape_and_ownership_failures_are_both_reported() {
        let cache = IdentityCache::new();
        let credential =
            Credential::password(cache.entity("c1").unwrap(), owner(&cache, "alice"), "");

        let verdict = check(credential, owner(&cache, "mallory"), Utc::now());
        assert_eq!(
            verdict.reasons(),
            vec![
                "password credential requires a secret hash",
                "credential owner does not match the validating actor",
            ]
        );
    }

    #[test]
    fn non_user_owner_is_structural() {
        let cache = IdentityCache::new();
        let tenant = IsolationContext::tenant(cache.tenant("t1").unwrap());
        let credential = Credential::password(cache.entity("c1").unwrap(), tenant.clone(), "hash");

        let err = CredentialValidationBusinessRule::default()
            .validate(&CredentialValidationContext {
                credential,
                validator: tenant,
                now: Utc::now(),
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::MalformedIsolationContext { .. }));
    }
}
