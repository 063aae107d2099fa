//! Authorization and code-exchange URI construction
//!
//! Pure functions from configuration + flow state to the URLs the flow
//! touches: the provider authorization endpoint, the redirect target the
//! gateway sends the agent back to, and the token exchange endpoint.

use url::Url;

use crate::error::{LoginError, LoginResult};
use crate::pkce::{CodeVerifier, CODE_CHALLENGE_METHOD};
use crate::state::LoginFlowState;
use crate::types::ClientConfig;

/// Default login endpoint path prefix on the authentication gateway
pub const DEFAULT_LOGIN_URI_PREFIX: &str = ".auth/login";

/// Fixed callback host used to recognize a redirect as belonging to this flow
pub const CALLBACK_HOST: &str = "easyauth.callback";

/// Fixed path segment of the code exchange endpoint
pub const TOKEN_PATH_SEGMENT: &str = "token";

const PARAM_REDIRECT_URL: &str = "post_login_redirect_url";
const PARAM_CODE_CHALLENGE: &str = "code_challenge";
const PARAM_CODE_CHALLENGE_METHOD: &str = "code_challenge_method";
const PARAM_AUTHORIZATION_CODE: &str = "authorization_code";
const PARAM_CODE_VERIFIER: &str = "code_verifier";

/// Normalize a caller-supplied provider name into its gateway path form
///
/// Trims surrounding whitespace and slashes and lowercases. The directory
/// provider's long names alias to the gateway's short `aad` segment.
#[must_use]
pub fn normalize_provider(provider: &str) -> String {
    let normalized = provider.trim().trim_matches('/').to_lowercase();
    match normalized.as_str() {
        "windowsazureactivedirectory" | "azureactivedirectory" => "aad".to_owned(),
        _ => normalized,
    }
}

/// Join two path fragments with exactly one `/` at the seam
fn combine_path(left: &str, right: &str) -> String {
    let left = left.trim_end_matches('/');
    let right = right.trim_start_matches('/');
    if right.is_empty() {
        left.to_owned()
    } else {
        format!("{left}/{right}")
    }
}

/// Reduce a URL to its scheme + authority, dropping path and query
fn host_only(raw_url: &str) -> LoginResult<String> {
    let url = Url::parse(raw_url)
        .map_err(|e| LoginError::Launch(format!("invalid application URL {raw_url:?}: {e}")))?;
    let host = url
        .host_str()
        .ok_or_else(|| LoginError::Launch(format!("application URL {raw_url:?} has no host")))?;

    let mut base = format!("{}://{}", url.scheme(), host);
    if let Some(port) = url.port() {
        base.push_str(&format!(":{port}"));
    }
    Ok(base)
}

/// Resolve the login endpoint path for a provider against the configured host
///
/// The path is `(login_uri_prefix | default) / provider`, anchored at the
/// alternate login host when one is configured, else at the host-only form of
/// the application URL. An absent alternate host always means "use the app's
/// own base URL".
fn build_url_path(
    provider: &str,
    app_url: &str,
    login_uri_prefix: Option<&str>,
    alternate_login_host: Option<&str>,
) -> LoginResult<String> {
    let prefix = login_uri_prefix.unwrap_or(DEFAULT_LOGIN_URI_PREFIX);
    let path = combine_path(prefix, provider);

    let base = match alternate_login_host {
        Some(host) => host.trim_end_matches('/').to_owned(),
        None => host_only(app_url)?,
    };

    Ok(combine_path(&base, &path))
}

/// The redirect target the gateway sends the external agent back to
#[must_use]
pub fn redirect_target(uri_scheme: &str) -> String {
    format!("{uri_scheme}://{CALLBACK_HOST}")
}

/// Build the provider authorization URI for a new login attempt
///
/// Appends the caller's extra parameters, then the three fixed flow
/// parameters (redirect target, code challenge, challenge method). The fixed
/// parameters overwrite caller extras on key collision.
///
/// # Errors
/// Returns [`LoginError::Launch`] when the URI scheme is empty, the verifier
/// is empty, or the configured URLs cannot be combined into a valid endpoint.
pub fn build_login_uri(
    provider: &str,
    uri_scheme: &str,
    extra_params: &[(String, String)],
    verifier: &CodeVerifier,
    config: &ClientConfig,
) -> LoginResult<Url> {
    if uri_scheme.is_empty() {
        return Err(LoginError::Launch("no URI scheme configured for the redirect".to_owned()));
    }
    if verifier.as_str().is_empty() {
        return Err(LoginError::Launch("no code verifier available".to_owned()));
    }

    let path = build_url_path(
        provider,
        config.app_url.as_str(),
        config.login_uri_prefix.as_deref(),
        config.alternate_login_host.as_ref().map(url::Url::as_str),
    )?;

    let mut url = Url::parse(&path)
        .map_err(|e| LoginError::Launch(format!("invalid login endpoint {path:?}: {e}")))?;

    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in extra_params {
            // Fixed flow parameters win over caller extras
            if key != PARAM_REDIRECT_URL
                && key != PARAM_CODE_CHALLENGE
                && key != PARAM_CODE_CHALLENGE_METHOD
            {
                pairs.append_pair(key, value);
            }
        }
        pairs.append_pair(PARAM_REDIRECT_URL, &redirect_target(uri_scheme));
        pairs.append_pair(PARAM_CODE_CHALLENGE, &verifier.challenge());
        pairs.append_pair(PARAM_CODE_CHALLENGE_METHOD, CODE_CHALLENGE_METHOD);
    }

    Ok(url)
}

/// Build the code exchange URI for a validated authorization code
///
/// `GET <endpoint base>/token?authorization_code=..&code_verifier=..`, with
/// the endpoint base resolved from the persisted flow state exactly as the
/// login endpoint was.
///
/// # Errors
/// Returns [`LoginError::Launch`] when the persisted URLs cannot be combined
/// into a valid endpoint.
pub fn build_code_exchange_uri(state: &LoginFlowState, code: &str) -> LoginResult<Url> {
    let path = build_url_path(
        state.authentication_provider(),
        state.app_url(),
        state.login_uri_prefix(),
        state.alternate_login_host(),
    )?;
    let path = combine_path(&path, TOKEN_PATH_SEGMENT);

    let mut url = Url::parse(&path)
        .map_err(|e| LoginError::Launch(format!("invalid exchange endpoint {path:?}: {e}")))?;

    url.query_pairs_mut()
        .append_pair(PARAM_AUTHORIZATION_CODE, code)
        .append_pair(PARAM_CODE_VERIFIER, state.code_verifier().as_str());

    Ok(url)
}
