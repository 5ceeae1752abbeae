use symserve_core::{Resolution, ServerConfig};

pub fn run(config: &ServerConfig, path: &str) -> anyhow::Result<()> {
    let resolver = symserve_runtime::build_default_resolver(config);

    match resolver.resolve(path)? {
        Resolution::IndexProbe => println!("index probe"),
        Resolution::Miss(reason) => println!("not found: {reason}"),
        Resolution::Found(resolved) => {
            println!("request:  {}", resolved.request);
            println!("entry:    {}", resolved.entry_key);
            println!("build:    {}", resolved.build.build_id());
            println!("project:  {}", resolved.project_id);
            println!("artifact: {}", resolved.artifact_path);
        }
    }
    Ok(())
}
