//! Interactive login for an unauthorized session
//!
//! The persisted session is reused whenever it is already authorized; only a
//! fresh session walks through phone number, login code and, for accounts
//! with two-step verification, the cloud password.

use std::io::{self, BufRead, Stderr, StdinLock, Write};

use grammers_client::types::{LoginToken, PasswordToken};
use grammers_client::{Client, InvocationError, SignInError};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Source of the answers the login flow needs from a human.
pub trait LoginPrompt {
    fn phone(&mut self) -> Result<String>;
    fn code(&mut self) -> Result<String>;
    fn password(&mut self, hint: Option<&str>) -> Result<String>;
}

/// Line-oriented prompt: writes a question, reads one trimmed line back.
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
    phone: Option<String>,
}

/// Questions go to stderr so stdout stays reserved for command output.
pub type StdinPrompt = LinePrompt<StdinLock<'static>, Stderr>;

impl StdinPrompt {
    /// Prompt on the terminal. A configured phone number is used without asking.
    pub fn new(phone: Option<String>) -> Self {
        LinePrompt::with_io(io::stdin().lock(), io::stderr(), phone)
    }
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn with_io(input: R, output: W, phone: Option<String>) -> Self {
        Self {
            input,
            output,
            phone,
        }
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(Error::AuthenticationError(
                "input closed before login finished".to_string(),
            ));
        }
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead, W: Write> LoginPrompt for LinePrompt<R, W> {
    fn phone(&mut self) -> Result<String> {
        if let Some(phone) = self.phone.clone() {
            return Ok(phone);
        }
        self.ask("Enter your phone number (international format): ")
    }

    fn code(&mut self) -> Result<String> {
        self.ask("Enter the code you received in Telegram: ")
    }

    fn password(&mut self, hint: Option<&str>) -> Result<String> {
        let question = match hint {
            Some(hint) if !hint.is_empty() => format!("Enter your 2FA password (hint: {}): ", hint),
            _ => "Enter your 2FA password: ".to_string(),
        };
        self.ask(&question)
    }
}

/// Result of submitting a login code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    /// Signed in; carries the account's display name.
    SignedIn(String),
    PasswordRequired { hint: Option<String> },
}

/// The server side of the login conversation.
#[allow(async_fn_in_trait)]
pub trait LoginFlow {
    async fn is_authorized(&mut self) -> Result<bool>;
    async fn request_code(&mut self, phone: &str) -> Result<()>;
    async fn submit_code(&mut self, code: &str) -> Result<SignInOutcome>;
    async fn submit_password(&mut self, password: &str) -> Result<String>;
}

/// Make sure the session behind `flow` is authorized, prompting only if it isn't.
pub async fn ensure_authorized<F, P>(flow: &mut F, prompt: &mut P) -> Result<()>
where
    F: LoginFlow,
    P: LoginPrompt + ?Sized,
{
    if flow.is_authorized().await? {
        debug!("session already authorized");
        return Ok(());
    }

    info!("session is not authorized, starting interactive login");

    let phone = non_empty(prompt.phone()?, "phone number")?;
    flow.request_code(&phone).await?;

    let code = non_empty(prompt.code()?, "login code")?;
    let name = match flow.submit_code(&code).await? {
        SignInOutcome::SignedIn(name) => name,
        SignInOutcome::PasswordRequired { hint } => {
            let password = non_empty(prompt.password(hint.as_deref())?, "password")?;
            flow.submit_password(&password).await?
        }
    };

    info!(account = %name, "signed in; session saved for later runs");
    Ok(())
}

fn non_empty(value: String, what: &str) -> Result<String> {
    if value.is_empty() {
        Err(Error::AuthenticationError(format!("empty {}", what)))
    } else {
        Ok(value)
    }
}

/// grammers-backed login flow.
pub struct GrammersLogin<'a> {
    client: &'a Client,
    api_hash: &'a str,
    login_token: Option<LoginToken>,
    password_token: Option<PasswordToken>,
}

impl<'a> GrammersLogin<'a> {
    pub fn new(client: &'a Client, api_hash: &'a str) -> Self {
        Self {
            client,
            api_hash,
            login_token: None,
            password_token: None,
        }
    }
}

impl LoginFlow for GrammersLogin<'_> {
    async fn is_authorized(&mut self) -> Result<bool> {
        Ok(self.client.is_authorized().await?)
    }

    async fn request_code(&mut self, phone: &str) -> Result<()> {
        let token = self
            .client
            .request_login_code(phone, self.api_hash)
            .await
            .map_err(|e| rejected_or_unreachable("Failed to request code", e))?;
        self.login_token = Some(token);
        Ok(())
    }

    async fn submit_code(&mut self, code: &str) -> Result<SignInOutcome> {
        let token = self
            .login_token
            .as_ref()
            .ok_or_else(|| Error::AuthenticationError("login code was never requested".into()))?;

        match self.client.sign_in(token, code).await {
            Ok(user) => Ok(SignInOutcome::SignedIn(user.full_name())),
            Err(SignInError::PasswordRequired(password_token)) => {
                let hint = password_token.hint().map(str::to_string);
                self.password_token = Some(password_token);
                Ok(SignInOutcome::PasswordRequired { hint })
            }
            Err(e) => Err(sign_in_failure("Failed to sign in", e)),
        }
    }

    async fn submit_password(&mut self, password: &str) -> Result<String> {
        let token = self
            .password_token
            .take()
            .ok_or_else(|| Error::AuthenticationError("no password was requested".into()))?;

        let user = self
            .client
            .check_password(token, password)
            .await
            .map_err(|e| sign_in_failure("Failed to check password", e))?;
        Ok(user.full_name())
    }
}

/// During login any RPC answer is a rejection of what we sent; everything
/// else never reached Telegram and keeps its connectivity classification.
fn rejected_or_unreachable(context: &str, err: InvocationError) -> Error {
    match err {
        InvocationError::Rpc(_) => Error::AuthenticationError(format!("{}: {}", context, err)),
        other => Error::from(other),
    }
}

fn sign_in_failure(context: &str, err: SignInError) -> Error {
    match err {
        SignInError::Other(inner) => rejected_or_unreachable(context, inner),
        rejected => Error::AuthenticationError(format!("{}: {}", context, rejected)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[derive(Default)]
    struct ScriptedFlow {
        authorized: bool,
        reject_code: bool,
        password_hint: Option<Option<String>>,
        calls: Vec<String>,
    }

    impl LoginFlow for ScriptedFlow {
        async fn is_authorized(&mut self) -> Result<bool> {
            self.calls.push("is_authorized".into());
            Ok(self.authorized)
        }

        async fn request_code(&mut self, phone: &str) -> Result<()> {
            self.calls.push(format!("request_code:{}", phone));
            Ok(())
        }

        async fn submit_code(&mut self, code: &str) -> Result<SignInOutcome> {
            self.calls.push(format!("submit_code:{}", code));
            if self.reject_code {
                return Err(Error::AuthenticationError("PHONE_CODE_INVALID".into()));
            }
            match self.password_hint.clone() {
                Some(hint) => Ok(SignInOutcome::PasswordRequired { hint }),
                None => Ok(SignInOutcome::SignedIn("Test User".into())),
            }
        }

        async fn submit_password(&mut self, password: &str) -> Result<String> {
            self.calls.push(format!("submit_password:{}", password));
            Ok("Test User".into())
        }
    }

    fn prompt(input: &str, phone: Option<&str>) -> LinePrompt<Cursor<Vec<u8>>, Vec<u8>> {
        LinePrompt::with_io(
            Cursor::new(input.as_bytes().to_vec()),
            Vec::new(),
            phone.map(str::to_string),
        )
    }

    #[test]
    fn terminal_prompt_asks_on_stderr() {
        let _: fn(Option<String>) -> LinePrompt<StdinLock<'static>, Stderr> = StdinPrompt::new;
    }

    #[tokio::test]
    async fn authorized_session_skips_prompts() {
        let mut flow = ScriptedFlow {
            authorized: true,
            ..Default::default()
        };
        let mut prompt = prompt("", None);

        ensure_authorized(&mut flow, &mut prompt).await.expect("authorized");
        assert_eq!(flow.calls, vec!["is_authorized"]);
        assert!(prompt.output.is_empty());
    }

    #[tokio::test]
    async fn fresh_session_asks_phone_and_code() {
        let mut flow = ScriptedFlow::default();
        let mut prompt = prompt("+15550100\n 12345 \n", None);

        ensure_authorized(&mut flow, &mut prompt).await.expect("login");
        assert_eq!(
            flow.calls,
            vec!["is_authorized", "request_code:+15550100", "submit_code:12345"]
        );
    }

    #[tokio::test]
    async fn configured_phone_is_not_prompted() {
        let mut flow = ScriptedFlow::default();
        let mut prompt = prompt("777\n", Some("+4930123"));

        ensure_authorized(&mut flow, &mut prompt).await.expect("login");
        assert_eq!(flow.calls[1], "request_code:+4930123");
        let shown = String::from_utf8(prompt.output.clone()).expect("utf8");
        assert!(!shown.contains("phone number"));
    }

    #[tokio::test]
    async fn two_step_password_is_requested_with_hint() {
        let mut flow = ScriptedFlow {
            password_hint: Some(Some("pet name".into())),
            ..Default::default()
        };
        let mut prompt = prompt("+1\n111\nhunter2\n", None);

        ensure_authorized(&mut flow, &mut prompt).await.expect("login");
        assert_eq!(flow.calls.last().map(String::as_str), Some("submit_password:hunter2"));
        let shown = String::from_utf8(prompt.output.clone()).expect("utf8");
        assert!(shown.contains("hint: pet name"));
    }

    #[tokio::test]
    async fn rejected_code_is_an_authentication_error() {
        let mut flow = ScriptedFlow {
            reject_code: true,
            ..Default::default()
        };
        let mut prompt = prompt("+1\n000\n", None);

        let err = ensure_authorized(&mut flow, &mut prompt).await.unwrap_err();
        assert!(matches!(err, Error::AuthenticationError(_)));
    }

    #[tokio::test]
    async fn empty_code_fails_before_submitting() {
        let mut flow = ScriptedFlow::default();
        let mut prompt = prompt("+1\n\n", None);

        let err = ensure_authorized(&mut flow, &mut prompt).await.unwrap_err();
        assert!(matches!(err, Error::AuthenticationError(ref m) if m.contains("login code")));
        assert!(!flow.calls.iter().any(|c| c.starts_with("submit_code")));
    }

    fn rpc(code: i32, message: &str) -> InvocationError {
        InvocationError::Rpc(grammers_mtsender::RpcError::from(
            grammers_tl_types::types::RpcError {
                error_code: code,
                error_message: message.to_string(),
            },
        ))
    }

    #[test]
    fn rejected_login_requests_are_authentication_errors() {
        let err = rejected_or_unreachable("Failed to request code", rpc(400, "API_ID_INVALID"));
        assert!(matches!(err, Error::AuthenticationError(ref m) if m.contains("API_ID_INVALID")));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn network_failures_during_login_are_connection_errors() {
        let dropped = rejected_or_unreachable("Failed to request code", InvocationError::Dropped);
        assert!(matches!(dropped, Error::ConnectionError(_)));
        assert_eq!(dropped.exit_code(), 3);

        let io_err = InvocationError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset by peer",
        ));
        let err = rejected_or_unreachable("Failed to request code", io_err);
        assert!(matches!(err, Error::ConnectionError(_)));
    }

    #[test]
    fn sign_in_rejections_are_authentication_errors() {
        let code = sign_in_failure("Failed to sign in", SignInError::InvalidCode);
        assert!(matches!(code, Error::AuthenticationError(_)));

        let password = sign_in_failure("Failed to check password", SignInError::InvalidPassword);
        assert!(matches!(password, Error::AuthenticationError(_)));

        let expired = sign_in_failure(
            "Failed to sign in",
            SignInError::Other(rpc(400, "PHONE_CODE_EXPIRED")),
        );
        assert!(matches!(expired, Error::AuthenticationError(ref m) if m.contains("PHONE_CODE_EXPIRED")));
    }

    #[test]
    fn sign_in_transport_failure_is_a_connection_error() {
        let err = sign_in_failure("Failed to sign in", SignInError::Other(InvocationError::Dropped));
        assert!(matches!(err, Error::ConnectionError(_)));
        assert_eq!(err.exit_code(), 3);
    }

    #[tokio::test]
    async fn closed_input_is_an_authentication_error() {
        let mut flow = ScriptedFlow::default();
        let mut prompt = prompt("", None);

        let err = ensure_authorized(&mut flow, &mut prompt).await.unwrap_err();
        assert!(matches!(err, Error::AuthenticationError(ref m) if m.contains("input closed")));
        assert_eq!(flow.calls, vec!["is_authorized"]);
    }
}
