use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Arg, Command};

use pades_sigval::{
    aggregate, DocumentVerdict, PdfSignatureVerifier, SignatureStatus, UnconfiguredPathValidator,
};

fn main() -> Result<()> {
    env_logger::init();

    let matches = Command::new("pades-sigval")
        .version("0.1.0")
        .about("Validate PAdES signatures and SVT tokens in PDF documents")
        .arg(
            Arg::new("input")
                .value_name("FILE")
                .help("PDF document to validate")
                .required(true),
        )
        .arg(
            Arg::new("time")
                .short('t')
                .long("time")
                .value_name("EPOCH_SECONDS")
                .help("Reference time for certificate path validation"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print the document verdict")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let input_path = PathBuf::from(
        matches
            .get_one::<String>("input")
            .expect("input is required"),
    );
    let reference_time = matches
        .get_one::<String>("time")
        .map(|value| value.parse::<u64>())
        .transpose()
        .context("--time must be epoch seconds")?;
    let quiet = matches.get_flag("quiet");

    let pdf_bytes = std::fs::read(&input_path)
        .with_context(|| format!("failed to read {}", input_path.display()))?;

    // Without a configured trust store, path validation reports
    // indeterminate; structural and cryptographic checks still run.
    let verifier = PdfSignatureVerifier::new(UnconfiguredPathValidator);
    let results = verifier
        .validate_at(&pdf_bytes, reference_time)
        .context("document validation failed")?;
    let document = aggregate(results);

    if !quiet {
        for (index, result) in document.results.iter().enumerate() {
            println!("signature #{}", index + 1);
            println!("  success:          {}", result.success);
            if let Some(status) = result.status {
                println!("  status:           {}", status_name(status));
            }
            if let Some(message) = &result.status_message {
                println!("  message:          {message}");
            }
            println!("  pades:            {}", result.is_pades);
            println!("  covers document:  {}", result.covers_document);
            if let Some(uri) = &result.signature_algorithm_uri {
                println!("  algorithm:        {uri}");
            }
            if result.svt_claims.is_some() {
                println!("  validated by SVT");
            }
            for policy in &result.policy_validation_results {
                println!("  policy {} -> {:?}", policy.pol, policy.res);
            }
        }
    }

    println!(
        "{} ({}/{} valid)",
        verdict_name(document.verdict),
        document.valid_signature_count,
        document.signature_count
    );

    if document.verdict == DocumentVerdict::Ok {
        Ok(())
    } else {
        std::process::exit(1)
    }
}

fn status_name(status: SignatureStatus) -> &'static str {
    match status {
        SignatureStatus::Success => "success",
        SignatureStatus::ErrorBadFormat => "bad-format",
        SignatureStatus::ErrorSignerInvalid => "signer-invalid",
        SignatureStatus::ErrorInvalidSignature => "invalid-signature",
    }
}

fn verdict_name(verdict: DocumentVerdict) -> &'static str {
    match verdict {
        DocumentVerdict::NoSignatures => "no signatures",
        DocumentVerdict::Ok => "ok",
        DocumentVerdict::SomeInvalid => "some signatures invalid",
        DocumentVerdict::NoneValid => "no valid signatures",
    }
}
