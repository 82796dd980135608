use mrirecon_proto::{scatter_all, widen_dims, SampleArray};

use crate::cmd::submit::read_stream;
use crate::cmd::DumpArgs;
use crate::exit::{data_error, CliResult, SUCCESS};
use crate::output::{print_dump, OutputFormat};

pub fn run(args: DumpArgs, format: OutputFormat) -> CliResult<i32> {
    let (header, measurements) = read_stream(&args.file)?;
    let dims = widen_dims(&header.dims, &measurements);
    let mut array =
        SampleArray::new(dims, header.complex).map_err(|err| data_error("cannot allocate", err))?;
    scatter_all(&measurements, &mut array);

    let source = args.file.display().to_string();
    print_dump(&source, measurements.len(), &array.summary(), format);
    Ok(SUCCESS)
}
