//! Secret encryption and decryption with `ansible-vault`.
//!
//! Plaintext is piped on stdin and ciphertext is staged as a workspace file;
//! neither ever appears on a command line.

use std::sync::Arc;

use serde::Deserialize;

use crate::plan::{non_empty, Arg, CommandPlan, Invocation, OutputStyle};
use crate::registry::{BuildContext, Operation, Tool};
use crate::schema::{Field, ParamSchema};
use crate::ToolError;

const CIPHERTEXT_FILE: &str = "encrypted.txt";

#[derive(Debug, Deserialize)]
pub struct EncryptOptions {
    pub string: String,
    pub vault_id: Option<String>,
    pub vault_password_file: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DecryptOptions {
    pub string: String,
    pub vault_id: Option<String>,
    pub vault_password_file: Option<String>,
}

pub fn tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Operation::<EncryptOptions>::new(
            "vault_encrypt_string",
            "Encrypt a string using Ansible Vault",
            ParamSchema::new()
                .field(Field::non_empty("string").required().describe("The string to encrypt"))
                .field(Field::string("vault_id").describe("Vault ID, e.g. dev@prompt"))
                .field(Field::string("vault_password_file").describe("Path to the vault password file"))
                .field(Field::string("name").describe("Variable name for the encrypted string")),
            encrypt_string,
        )
        .into_tool(),
        Operation::<DecryptOptions>::new(
            "vault_decrypt_string",
            "Decrypt a string encrypted with Ansible Vault",
            ParamSchema::new()
                .field(Field::non_empty("string").required().describe("The vault-encrypted string"))
                .field(Field::string("vault_id"))
                .field(Field::string("vault_password_file")),
            decrypt_string,
        )
        .into_tool(),
    ]
}

fn credential_args(
    vault_id: Option<&str>,
    password_file: Option<&str>,
    ctx: &BuildContext,
) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(id) = non_empty(vault_id) {
        args.push(format!("--vault-id={}", id));
    }
    if let Some(file) = non_empty(password_file) {
        args.push(format!("--vault-password-file={}", ctx.resolve_arg(file)));
    }
    args
}

fn encrypt_string(opts: &EncryptOptions, ctx: &BuildContext) -> Result<CommandPlan, ToolError> {
    let mut step = Invocation::new("ansible-vault")
        .arg("encrypt_string")
        .args(credential_args(opts.vault_id.as_deref(), opts.vault_password_file.as_deref(), ctx));
    if let Some(name) = non_empty(opts.name.as_deref()) {
        step = step.arg(format!("--name={}", name));
    }
    let step = step.arg("--stdin").stdin(opts.string.as_str());

    Ok(CommandPlan::new("vault_encrypt_string", step).output(OutputStyle::Trimmed))
}

fn decrypt_string(opts: &DecryptOptions, ctx: &BuildContext) -> Result<CommandPlan, ToolError> {
    let step = Invocation::new("ansible-vault")
        .arg("decrypt")
        .args(credential_args(opts.vault_id.as_deref(), opts.vault_password_file.as_deref(), ctx))
        .arg(Arg::file(CIPHERTEXT_FILE))
        .arg("--output=-");

    Ok(CommandPlan::new("vault_decrypt_string", step)
        .file(CIPHERTEXT_FILE, opts.string.as_str())
        .output(OutputStyle::Trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::WorkingDir;
    use crate::registry::build_plan;
    use serde_json::json;

    #[test]
    fn test_encrypt_pipes_secret_on_stdin() {
        let plan = build_plan(
            &tools(),
            "vault_encrypt_string",
            json!({
                "string": "hunter2",
                "vault_id": "dev@prompt",
                "vault_password_file": "pass.txt",
                "name": "db_password"
            }),
        )
        .unwrap();

        assert_eq!(
            plan.command_lines(),
            vec!["ansible-vault encrypt_string --vault-id=dev@prompt --vault-password-file=/work/pass.txt --name=db_password --stdin"]
        );
        assert_eq!(plan.steps[0].stdin.as_deref(), Some("hunter2"));
        assert!(!plan.command_lines()[0].contains("hunter2"));
        assert!(!plan.needs_workspace());
        assert_eq!(plan.render_output(&["  !vault |\n  $ANSIBLE_VAULT\n".to_string()]), "!vault |\n  $ANSIBLE_VAULT");
    }

    #[test]
    fn test_decrypt_stages_ciphertext() {
        let ciphertext = "$ANSIBLE_VAULT;1.1;AES256\n6162\n";
        let plan = build_plan(&tools(), "vault_decrypt_string", json!({"string": ciphertext})).unwrap();

        assert_eq!(
            plan.command_lines(),
            vec!["ansible-vault decrypt encrypted.txt --output=-"]
        );
        assert_eq!(plan.file_content(CIPHERTEXT_FILE), Some(ciphertext));
        assert!(plan.needs_workspace());
        assert_eq!(plan.working_dir, WorkingDir::Inherit);
        assert_eq!(
            plan.steps[0].resolve_args(Some(std::path::Path::new("/tmp/ws"))).unwrap(),
            vec!["decrypt", "/tmp/ws/encrypted.txt", "--output=-"]
        );
    }

    #[test]
    fn test_empty_optional_strings_are_omitted() {
        let plan = build_plan(
            &tools(),
            "vault_encrypt_string",
            json!({"string": "hunter2", "vault_id": "", "vault_password_file": "", "name": ""}),
        )
        .unwrap();
        assert_eq!(plan.command_lines(), vec!["ansible-vault encrypt_string --stdin"]);

        let plan = build_plan(
            &tools(),
            "vault_decrypt_string",
            json!({"string": "$ANSIBLE_VAULT;1.1;AES256\n6162\n", "vault_id": ""}),
        )
        .unwrap();
        assert_eq!(plan.command_lines(), vec!["ansible-vault decrypt encrypted.txt --output=-"]);
    }

    #[test]
    fn test_empty_secret_rejected() {
        let err = build_plan(&tools(), "vault_encrypt_string", json!({"string": ""})).unwrap_err();
        assert!(err.to_string().contains("string: must not be empty"));
    }
}
