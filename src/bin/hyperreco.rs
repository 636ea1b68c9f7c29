/**
 * HyperReco
 * Copyright (C) 2018 Sebastian Schelter
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

extern crate getopts;
extern crate hyperreco;
extern crate num_cpus;
extern crate tracing;
extern crate tracing_subscriber;

use std::env;
use std::error::Error;
use std::process;
use std::str::FromStr;

use getopts::{Matches, Options};
use tracing::info;
use tracing_subscriber::EnvFilter;

use hyperreco::io;
use hyperreco::recommend;
use hyperreco::{Device, HypergraphModel, ModelConfig};

fn main() {

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("d", "datadir", "Dataset directory (required). It must contain data_size.txt, \
        user_item.txt, bundle_item.txt and user_bundle_train.txt, with one tab separated pair of \
        integer ids per line.", "PATH");
    opts.optopt("o", "outputfile", "Output file name (optional, output will be written to stdout \
        by default).", "PATH");
    opts.optopt("n", "num-bundles", "Number of bundles to recommend per user (optional, \
        defaults to 10).", "NUMBER");
    opts.optopt("c", "config", "Model configuration as JSON (optional).", "PATH");
    opts.optopt("p", "parameters", "Trained parameters as JSON (optional, randomly initialized \
        parameters are used otherwise).", "PATH");
    opts.optopt("t", "threshold", "Co-occurrence count above which users or bundles are \
        considered similar (optional, defaults to 10).", "NUMBER");
    opts.optopt("s", "split-num", "Number of row blocks of the propagation operator (optional, \
        defaults to 16).", "NUMBER");
    opts.optopt("e", "emb-size", "Embedding dimension (optional, defaults to 64).", "NUMBER");
    opts.optopt("", "threads", "Number of threads for propagation (optional, defaults to the \
        number of CPUs).", "NUMBER");
    opts.optflag("h", "help", "Print this help menu");

    let matches = match opts.parse(&args[1..]) {
        Ok(matches) => matches,
        Err(failure) => {
            let hint = failure.to_string();
            return print_usage_and_exit(&program, opts, Some(&hint))
        },
    };

    if matches.opt_present("h") {
        return print_usage_and_exit(&program, opts, None);
    }

    let data_dir = match matches.opt_str("d") {
        Some(data_dir) => data_dir,
        None => return print_usage_and_exit(
            &program,
            opts,
            Some("Please specify a dataset directory via --datadir."),
        ),
    };

    let (config, n) = match configure(&matches) {
        Ok(configured) => configured,
        Err(hint) => return print_usage_and_exit(&program, opts, Some(&hint)),
    };

    if let Err(failure) = compute_recommendations(
        &data_dir,
        &config,
        n,
        matches.opt_str("p"),
        matches.opt_str("o"),
    ) {
        eprintln!("{}", failure);
        process::exit(1);
    }
}

fn print_usage_and_exit(
    program: &str,
    opts: Options,
    hint: Option<&str>
) {

    if let Some(hint) = hint {
        eprintln!("\n{}\n", hint);
    }

    let brief = format!("Usage: {} [options]", program);
    eprint!("{}", opts.usage(&brief));

    if hint.is_some() {
        process::exit(1);
    }
}

fn option<T: FromStr>(matches: &Matches, name: &str) -> Result<Option<T>, String>
    where T::Err: ToString {

    matches.opt_get(name)
        .map_err(|failure: T::Err| format!("Problem with option '{}': {}", name, failure.to_string()))
}

/// Starts from the JSON configuration, if any, and overrides it with the flags on the command
/// line.
fn configure(matches: &Matches) -> Result<(ModelConfig, usize), String> {

    let mut config = match matches.opt_str("c") {
        Some(path) => ModelConfig::from_json_file(&path).map_err(|failure| failure.to_string())?,
        None => ModelConfig { device: Device::Threads(num_cpus::get()), ..Default::default() },
    };

    if let Some(threshold) = option(matches, "t")? {
        config.threshold = threshold;
    }
    if let Some(split_num) = option(matches, "s")? {
        config.split_num = split_num;
    }
    if let Some(emb_size) = option(matches, "e")? {
        config.emb_size = emb_size;
    }
    if let Some(threads) = option(matches, "threads")? {
        config.device = Device::Threads(threads);
    }

    let n: usize = matches.opt_get_default("n", 10)
        .map_err(|failure: <usize as FromStr>::Err| format!("Problem with option 'n': {}", failure.to_string()))?;

    config.validate().map_err(|failure| failure.to_string())?;

    Ok((config, n))
}

fn compute_recommendations(
    data_dir: &str,
    config: &ModelConfig,
    n: usize,
    parameters_path: Option<String>,
    recommendations_path: Option<String>,
) -> Result<(), Box<dyn Error>> {

    info!(data_dir, "reading dataset");
    let relations = io::read_dataset(data_dir)?;

    let mut model = HypergraphModel::new(&relations, config)?;

    if let Some(path) = parameters_path {
        info!(path = %path, "loading parameters");
        model.load_parameters(io::read_parameters(&path)?)?;
    }

    let propagated = model.propagate_eval()?;

    let users: Vec<usize> = (0..model.dimensions().num_users).collect();

    info!(num_users = users.len(), n, "computing recommendations");
    let recommendations = recommend::recommend(
        &model,
        &propagated,
        &users,
        n,
        &relations.user_bundle,
    )?;

    info!("writing recommendations");
    io::write_recommendations(&users, &recommendations, recommendations_path)?;

    Ok(())
}
