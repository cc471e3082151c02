use std::fs::File;
use std::io::Write;

use crate::aggregate::EnumerationResult;
use crate::error::EnumError;
use crate::input::OutputFormat;

/// 渲染枚举结果
pub fn render(
    result: &EnumerationResult,
    format: OutputFormat,
    no_address: bool,
) -> Result<String, EnumError> {
    match format {
        OutputFormat::Json => {
            let json = if no_address {
                serde_json::to_string_pretty(&result.fqdns())?
            } else {
                serde_json::to_string_pretty(result)?
            };
            Ok(json + "\n")
        }
        OutputFormat::Plain => Ok(render_plain(result, no_address)),
    }
}

fn render_plain(result: &EnumerationResult, no_address: bool) -> String {
    let mut txt = String::new();
    for (fqdn, addresses) in result.iter() {
        if no_address {
            txt.push_str(&format!("{}\n", fqdn));
        } else {
            let addresses: Vec<String> = addresses.iter().map(|a| a.to_string()).collect();
            txt.push_str(&format!("{} : [{}]\n", fqdn, addresses.join(", ")));
        }
    }
    txt
}

/// 写入文件，未指定路径时输出到标准输出
pub fn write_output(content: &str, output_path: Option<&str>) -> Result<(), EnumError> {
    match output_path {
        Some(path) => {
            let mut file = File::create(path)?;
            file.write_all(content.as_bytes())?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(content.as_bytes())?;
            handle.flush()?;
        }
    }
    Ok(())
}
