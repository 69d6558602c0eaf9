//! # TeamFlow Auth (Account Authentication & Session Lifecycle)
//!
//! `teamflow-auth` is the authentication backend for the TeamFlow HR
//! platform. It verifies credentials, issues and rotates JWT session pairs,
//! and walks new accounts through email verification, optional TOTP
//! two-factor enrollment, and guided onboarding.
//!
//! ## Sessions
//!
//! A sign-in yields a short-lived access token and a long-lived refresh
//! token signed with separate secrets. Refresh tokens are single-use: each
//! redemption atomically replaces the presented token, so a replayed token
//! is rejected even under concurrent redemption.
//!
//! ## Lockout
//!
//! Five consecutive failed password attempts lock the account for two
//! hours. The lock expires on its own; a successful sign-in afterwards
//! clears the counter.
//!
//! ## Single-Use Tokens
//!
//! Email verification and password reset flow through random single-use
//! tokens whose SHA-256 digest is all that is stored. A redeemed or expired
//! token is indistinguishable from an unknown one. Consuming a reset token
//! also revokes every refresh token for the account.

pub mod api;
pub mod auth;
pub mod cli;
pub mod email;
pub mod store;
