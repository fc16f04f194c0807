use serde::Serialize;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::error::{CatalogError, CatalogResult};
use crate::protocol::*;
use crate::service::{parse_id, ShipService};
use crate::ShipyardDb;

pub type Catalog = ShipService<ShipyardDb>;

pub struct ShipyardServer {
    catalog: Catalog,
}

impl ShipyardServer {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    pub async fn run(&self, addr: &str) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "Shipyard listening");
        self.serve(listener).await
    }

    pub async fn serve(&self, listener: TcpListener) -> std::io::Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer)) => {
                    let catalog = self.catalog.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_client(socket, catalog).await {
                            // Ignore expected disconnections to keep logs clean
                            if e.kind() != std::io::ErrorKind::UnexpectedEof {
                                warn!(%peer, error = %e, "Client error");
                            }
                        }
                    });
                }
                Err(e) => error!(error = %e, "Connection failed"),
            }
        }
    }
}

async fn handle_client(mut stream: TcpStream, catalog: Catalog) -> std::io::Result<()> {
    loop {
        // 1. Read Frame
        let Some((op_code, body)) = read_frame_async(&mut stream).await? else {
            return Ok(());
        };

        // 2. Process Command
        let (status, reply) = match dispatch(op_code, body, &catalog).await {
            Ok(reply) => (STATUS_OK, reply),
            Err(e) => {
                debug!(op = op_code, error = %e, "Request rejected");
                let code = status_byte(e.status());
                (code, encode(&ErrorBody { error: e.to_string() }))
            }
        };

        // 3. Respond
        let mut writer = BufWriter::new(&mut stream);
        write_frame_async(&mut writer, status, &reply).await?;
        writer.flush().await?;
    }
}

async fn dispatch(op_code: u8, body: Vec<u8>, catalog: &Catalog) -> CatalogResult<Vec<u8>> {
    match op_code {
        // Read Operations
        OP_LIST => {
            let req: ListRequest = decode(&body)?;
            let ships = catalog.list_ships(&req.criteria, req.order, req.page_number, req.page_size)?;
            Ok(encode(&ships))
        }
        OP_COUNT => {
            let req: ListRequest = decode(&body)?;
            let count = catalog.count_ships(&req.criteria)?;
            Ok(encode(&CountBody { count }))
        }
        OP_GET => {
            let req: IdRequest = decode(&body)?;
            let id = parse_id(req.id.as_deref())?;
            let ship = catalog.get_ship(id)?.ok_or(CatalogError::NotFound(id))?;
            Ok(encode(&ship))
        }

        // Write Operations (may fsync)
        OP_CREATE => {
            let draft: CreateRequest = decode(&body)?;
            let ship = blocking(catalog, move |c| c.create_ship(draft)).await?;
            Ok(encode(&ship))
        }
        OP_UPDATE => {
            let req: UpdateRequest = decode(&body)?;
            let id = parse_id(req.id.as_deref())?;
            let ship = blocking(catalog, move |c| c.update_ship(id, &req.patch)).await?;
            Ok(encode(&ship))
        }
        OP_DELETE => {
            let req: IdRequest = decode(&body)?;
            let id = parse_id(req.id.as_deref())?;
            blocking(catalog, move |c| c.delete_ship(id)).await?;
            Ok(encode(&serde_json::json!({ "deleted": id })))
        }

        // Maintenance
        OP_COMPACT => {
            let report = blocking(catalog, |c| c.store().compact()).await?;
            Ok(encode(&report))
        }

        _ => Err(CatalogError::InvalidRequest(format!("Unknown OpCode: 0x{:02X}", op_code))),
    }
}

async fn blocking<T, F>(catalog: &Catalog, f: F) -> CatalogResult<T>
where
F: FnOnce(&Catalog) -> CatalogResult<T> + Send + 'static,
T: Send + 'static,
{
    let catalog = catalog.clone();
    tokio::task::spawn_blocking(move || f(&catalog))
    .await
    .map_err(|e| CatalogError::Storage(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))?
}

fn decode<T: serde::de::DeserializeOwned + Default>(body: &[u8]) -> CatalogResult<T> {
    if body.is_empty() {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| CatalogError::InvalidRequest(e.to_string()))
}

fn encode<T: Serialize>(value: &T) -> Vec<u8> {
    // Serializing plain data structs into a Vec cannot fail.
    serde_json::to_vec(value).unwrap_or_default()
}
