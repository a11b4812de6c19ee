use std::collections::HashMap;
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;
use std::{env, fs};

use indexmap::IndexMap;

use step_trace_analyze::validate;
use step_trace_assemble::inputs::{SpecialInput, SpecialInputKind};
use step_trace_assemble::{run_server_mode, TraceRequest};
use step_trace_core::{Artifact, NodeId, SourceNode};

mod manifest;
mod markdown;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("manifest") => {
            let Some(manifest_path) = args.get(2) else {
                eprintln!("usage: step-trace manifest <problems.json> <output-dir>");
                return ExitCode::FAILURE;
            };
            let Some(output_dir) = args.get(3) else {
                eprintln!("usage: step-trace manifest <problems.json> <output-dir>");
                return ExitCode::FAILURE;
            };
            run_manifest(Path::new(manifest_path), Path::new(output_dir))
        }
        Some("markdown") => {
            let Some(docs_dir) = args.get(2) else {
                eprintln!("usage: step-trace markdown <docs-dir> <output-dir>");
                return ExitCode::FAILURE;
            };
            let Some(output_dir) = args.get(3) else {
                eprintln!("usage: step-trace markdown <docs-dir> <output-dir>");
                return ExitCode::FAILURE;
            };
            run_markdown(Path::new(docs_dir), Path::new(output_dir))
        }
        _ => {
            eprintln!("usage: step-trace <manifest|markdown> ...");
            ExitCode::FAILURE
        }
    }
}

fn reset_output_dir(output_dir: &Path) -> Result<(), String> {
    if output_dir.exists() {
        fs::remove_dir_all(output_dir).map_err(|err| format!("could not clear {}: {err}", output_dir.display()))?;
    }
    fs::create_dir_all(output_dir).map_err(|err| format!("could not create {}: {err}", output_dir.display()))
}

fn write_artifact(output_dir: &Path, id: &str, artifact: &Artifact) -> Result<(), String> {
    let path = output_dir.join(format!("{id}.json"));
    let json = serde_json::to_string_pretty(artifact).map_err(|err| format!("could not serialize artifact '{id}': {err}"))?;
    fs::write(&path, json).map_err(|err| format!("could not write {}: {err}", path.display()))
}

fn run_manifest(manifest_path: &Path, output_dir: &Path) -> ExitCode {
    let start = Instant::now();
    let text = match fs::read_to_string(manifest_path) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("error reading {}: {err}", manifest_path.display());
            return ExitCode::FAILURE;
        }
    };
    let manifest: manifest::ManifestFile = match serde_json::from_str(&text) {
        Ok(m) => m,
        Err(err) => {
            eprintln!("error parsing {}: {err}", manifest_path.display());
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = reset_output_dir(output_dir) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    let mut artifacts: Vec<(String, Artifact)> = Vec::new();
    for problem in &manifest.problems {
        let code = match problem.code() {
            Ok(code) => code.to_string(),
            Err(err) => {
                eprintln!("error: {err}");
                return ExitCode::FAILURE;
            }
        };
        let special_inputs: Vec<SpecialInput> = match manifest::resolve_special_inputs(&problem.special_inputs) {
            Ok(specials) => specials,
            Err(err) => {
                eprintln!("error in problem '{}': {err}", problem.id);
                return ExitCode::FAILURE;
            }
        };
        let manual_relationships = match manifest::resolve_manual_relationships(&problem.manual_relationships) {
            Ok(rels) => rels,
            Err(err) => {
                eprintln!("error in problem '{}': {err}", problem.id);
                return ExitCode::FAILURE;
            }
        };
        let request = TraceRequest {
            code,
            entry_point: problem.entrypoint.clone(),
            inputs: problem.inputs.clone(),
            special_inputs,
            manual_relationships,
        };
        let artifact = run_server_mode(&request);
        if let Err(err) = write_artifact(output_dir, &problem.id, &artifact) {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
        artifacts.push((problem.id.clone(), artifact));
    }

    let elapsed = start.elapsed();
    report_validation(&artifacts, elapsed)
}

fn run_markdown(docs_dir: &Path, output_dir: &Path) -> ExitCode {
    let start = Instant::now();
    let files = match markdown::find_markdown_files(docs_dir) {
        Ok(files) => files,
        Err(err) => {
            eprintln!("error walking {}: {err}", docs_dir.display());
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = reset_output_dir(output_dir) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    let mut seen: HashMap<String, std::path::PathBuf> = HashMap::new();
    let mut artifacts: Vec<(String, Artifact)> = Vec::new();
    for file in &files {
        let text = match fs::read_to_string(file) {
            Ok(text) => text,
            Err(err) => {
                eprintln!("error reading {}: {err}", file.display());
                return ExitCode::FAILURE;
            }
        };
        for snippet in markdown::extract_snippets(&text, file) {
            if let Some(first_file) = seen.get(&snippet.trace_id) {
                if first_file != file {
                    eprintln!("error: duplicate trace-id '{}' in {} (first seen in {})", snippet.trace_id, file.display(), first_file.display());
                    return ExitCode::FAILURE;
                }
            }
            seen.insert(snippet.trace_id.clone(), file.clone());

            let request = TraceRequest {
                code: snippet.code,
                entry_point: None,
                inputs: IndexMap::new(),
                special_inputs: Vec::new(),
                manual_relationships: Vec::new(),
            };
            let artifact = run_server_mode(&request);
            if let Err(err) = write_artifact(output_dir, &snippet.trace_id, &artifact) {
                eprintln!("error: {err}");
                return ExitCode::FAILURE;
            }
            artifacts.push((snippet.trace_id, artifact));
        }
    }

    let elapsed = start.elapsed();
    report_validation(&artifacts, elapsed)
}

fn report_validation(artifacts: &[(String, Artifact)], elapsed: std::time::Duration) -> ExitCode {
    let mut all_valid = true;
    for (id, artifact) in artifacts {
        let entries: IndexMap<NodeId, SourceNode> = artifact.ast.iter().map(|node| (node.node_id, node.clone())).collect();
        let report = validate(&entries);
        if !report.is_valid() {
            all_valid = false;
            eprintln!("'{id}' failed validation: {} conflicting node id(s) of {}", report.conflicts.len(), report.total_nodes);
        }
    }
    eprintln!("traced {} artifact(s) in {elapsed:?}", artifacts.len());
    if all_valid {
        eprintln!("all artifacts passed validation");
        ExitCode::SUCCESS
    } else {
        eprintln!("validation failed");
        ExitCode::FAILURE
    }
}
