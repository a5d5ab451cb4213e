use clap::{ArgAction, Args, Parser, Subcommand};
use ethers_core::types::Address;
use permit_signer::eip712::get_pre_image;
use permit_signer::permit::{permit_pre_image, recover_permit_signer};
use permit_signer::utils::logging;
use permit_signer::{
    checksum_address, generate_permit_signature, log_error, log_info, parse_address,
    parse_uint_str, verify_permit_signature, DeploymentConfig, ErrorReport, PermitError,
    PermitMessage, PermitResult, PermitSignature, PrivateKey, TypedData,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Environment variable holding the signing key when `--key-file` is absent
const PRIVATE_KEY_ENV: &str = "PERMIT_PRIVATE_KEY";

/// Sign and check EIP-712 permit approvals.
#[derive(Parser)]
#[command(name = "permit-signer", version)]
struct Cli {
    /// Print debug logs to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print results and errors as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign a permit with the key from PERMIT_PRIVATE_KEY or --key-file.
    Sign {
        #[command(flatten)]
        message: MessageArgs,

        /// File containing the hex private key.
        #[arg(long)]
        key_file: Option<PathBuf>,
    },
    /// Print the domain separator, struct hash and digest of a permit.
    Digest {
        /// Address granting the approval.
        #[arg(long)]
        holder: String,

        #[command(flatten)]
        message: MessageArgs,
    },
    /// Check that a signature was produced by the holder.
    Verify {
        /// Address granting the approval.
        #[arg(long)]
        holder: String,

        #[command(flatten)]
        message: MessageArgs,

        /// 65-byte r || s || v signature, hex encoded.
        #[arg(long)]
        signature: String,
    },
    /// Hash an eth_signTypedData_v4 JSON document.
    TypedData {
        /// Path to the document.
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[derive(Args)]
struct MessageArgs {
    /// Deployment configuration file.
    #[arg(short, long)]
    config: PathBuf,

    /// Address being approved.
    #[arg(long)]
    spender: String,

    /// Holder nonce, decimal or 0x hex.
    #[arg(long, default_value = "0")]
    nonce: String,

    /// Expiry timestamp, decimal or 0x hex. 0 means no expiry.
    #[arg(long, default_value = "0")]
    expiry: String,

    /// Grant (true) or revoke (false) the approval.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    allowed: bool,
}

impl MessageArgs {
    fn load(&self, holder: Address) -> PermitResult<(DeploymentConfig, PermitMessage)> {
        let config = DeploymentConfig::from_file(&self.config)?;
        config.ensure_valid()?;

        let message = PermitMessage::new(
            holder,
            parse_address(&self.spender)?,
            parse_uint_str("uint256", &self.nonce)?,
            parse_uint_str("uint256", &self.expiry)?,
            self.allowed,
        );
        Ok((config, message))
    }
}

/// Command result plus whether the process should exit successfully
struct Outcome {
    report: Value,
    success: bool,
}

impl From<Value> for Outcome {
    fn from(report: Value) -> Self {
        Self {
            report,
            success: true,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.verbose {
        logging::enable_debug();
    }

    match run(cli.command) {
        Ok(outcome) => {
            print_report(&outcome.report, cli.json);
            if outcome.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            log_error!("cli", "command failed", code = format!("{:?}", e.code()));
            if cli.json {
                println!("{}", json!({ "error": ErrorReport::from(&e) }));
            } else {
                eprintln!("Error: {}", e);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> PermitResult<Outcome> {
    match command {
        Command::Sign { message, key_file } => cmd_sign(&message, key_file.as_deref()),
        Command::Digest { holder, message } => cmd_digest(&holder, &message),
        Command::Verify {
            holder,
            message,
            signature,
        } => cmd_verify(&holder, &message, &signature),
        Command::TypedData { file } => cmd_typed_data(&file),
    }
}

fn cmd_sign(args: &MessageArgs, key_file: Option<&Path>) -> PermitResult<Outcome> {
    let key = load_key(key_file)?;
    let (config, message) = args.load(key.address())?;

    let sig = generate_permit_signature(&key, config.domain(), &message)?;
    log_info!(
        "cli",
        "permit signed",
        holder = checksum_address(&message.holder),
        chain_id = config.domain.chain_id,
    );

    Ok(json!({ "r": sig.r, "s": sig.s, "v": sig.v }).into())
}

fn cmd_digest(holder: &str, args: &MessageArgs) -> PermitResult<Outcome> {
    let (config, message) = args.load(parse_address(holder)?)?;
    let pre_image = permit_pre_image(config.domain(), &message)?;

    Ok(json!({
        "domainSeparator": hex32(&pre_image.domain_separator),
        "structHash": hex32(&pre_image.struct_hash),
        "digest": hex32(&pre_image.final_hash),
    })
    .into())
}

fn cmd_verify(holder: &str, args: &MessageArgs, signature: &str) -> PermitResult<Outcome> {
    let (config, message) = args.load(parse_address(holder)?)?;
    let signature = PermitSignature::from_hex(signature)?;

    let valid = verify_permit_signature(&config, &message, &signature)?;
    let signer = recover_permit_signer(config.domain(), &message, &signature)?;

    Ok(Outcome {
        report: json!({
            "valid": valid,
            "signer": checksum_address(&signer),
        }),
        success: valid,
    })
}

fn cmd_typed_data(file: &Path) -> PermitResult<Outcome> {
    let contents = std::fs::read_to_string(file)
        .map_err(|e| PermitError::InvalidJson(format!("{}: {}", file.display(), e)))?;
    let typed_data = TypedData::from_json(&contents)?;
    let pre_image = get_pre_image(&typed_data)?;

    Ok(json!({
        "primaryType": typed_data.primary_type,
        "domainSeparator": hex32(&pre_image.domain_separator),
        "structHash": hex32(&pre_image.struct_hash),
        "digest": hex32(&pre_image.final_hash),
    })
    .into())
}

fn load_key(key_file: Option<&Path>) -> PermitResult<PrivateKey> {
    let secret = match key_file {
        Some(path) => SecretString::from(std::fs::read_to_string(path).map_err(|e| {
            PermitError::InvalidPrivateKey(format!("cannot read {}: {}", path.display(), e))
        })?),
        None => SecretString::from(std::env::var(PRIVATE_KEY_ENV).map_err(|_| {
            PermitError::InvalidPrivateKey(format!(
                "set {} or pass --key-file",
                PRIVATE_KEY_ENV
            ))
        })?),
    };

    PrivateKey::from_hex(secret.expose_secret().trim())
}

fn hex32(word: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(word))
}

fn print_report(report: &Value, as_json: bool) {
    if as_json {
        println!("{}", report);
        return;
    }

    if let Value::Object(fields) = report {
        for (name, value) in fields {
            match value {
                Value::String(s) => println!("{}: {}", name, s),
                other => println!("{}: {}", name, other),
            }
        }
    }
}
