use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Parser, Debug)]
#[command(name = "comanda")]
#[command(about = "client cli used by restaurant staffs to interact with the server", version, long_about = None
)]
struct Cli {
    #[arg(long, env = "COMANDA_HOST", default_value = "http://localhost:8080", help = "Server base url")]
    host: String,
    #[arg(long, env = "COMANDA_TOKEN", help = "Session token printed by `login`")]
    token: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// get a session token
    #[command(arg_required_else_help = true)]
    Login {
        identificador: String,
        password: String,
    },
    /// order related ops
    #[command(arg_required_else_help = true)]
    Orders(OrdersArgs),
    /// bill related ops
    #[command(arg_required_else_help = true)]
    Bill(BillArgs),
    /// sales report of a business day, `YYYY-MM-DD` or `YYYY-MM-DD,YYYY-MM-DD`
    #[command(arg_required_else_help = true)]
    Report { fecha: String },
}

#[derive(Debug, Args)]
struct OrdersArgs {
    #[command(subcommand)]
    command: OrderCmds,
}

#[derive(Debug, Subcommand)]
enum OrderCmds {
    List {
        #[arg(long, help = "Include cancelled orders")]
        all: bool,
    },
    #[command(arg_required_else_help = true)]
    Advance {
        #[arg(value_parser = clap::value_parser!(i64).range(1..))]
        id: i64,
        #[arg(help = "en_preparacion, listo, entregado or cancelado")]
        estado: String,
    },
    #[command(arg_required_else_help = true)]
    Create {
        #[arg(long, help = "Table id")]
        mesa: i64,
        #[arg(long, help = "Dishes as MENU_ITEM_ID:QTY", value_name = "MENU_ITEM_ID:QTY", num_args = 1.., value_parser = parse_line)]
        items: Vec<(i64, i32)>,
    },
}

#[derive(Debug, Args)]
struct BillArgs {
    #[command(subcommand)]
    command: BillCmds,
}

#[derive(Debug, Subcommand)]
enum BillCmds {
    #[command(arg_required_else_help = true)]
    Create {
        #[arg(long, value_name = "ORDER_ID", num_args = 1.., help = "Delivered orders of one table")]
        orders: Vec<i64>,
        #[arg(long, help = "Tip amount")]
        tip: Option<f64>,
        #[arg(long, help = "Treat --tip as a percentage of the subtotal")]
        percent: bool,
        #[arg(long, help = "Settle right away with this method")]
        pay: Option<String>,
    },
    #[command(arg_required_else_help = true)]
    Pay {
        id: i64,
        #[arg(long, default_value = "efectivo")]
        method: String,
    },
}

fn parse_line(raw: &str) -> Result<(i64, i32), String> {
    let (id, qty) = raw.split_once(':').unwrap_or((raw, "1"));
    match (id.parse(), qty.parse()) {
        (Ok(id), Ok(qty)) if qty > 0 => Ok((id, qty)),
        _ => Err(format!("expected MENU_ITEM_ID:QTY, got {raw}")),
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    mensaje: String,
}

struct Api {
    client: Client,
    host: String,
    token: Option<String>,
}

impl Api {
    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.host.trim_end_matches('/'), path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.request(self.client.get(self.url(path)))
    }

    fn post(&self, path: &str, body: Value) -> RequestBuilder {
        self.request(self.client.post(self.url(path)).json(&body))
    }

    fn put(&self, path: &str, body: Value) -> RequestBuilder {
        self.request(self.client.put(self.url(path)).json(&body))
    }
}

/// Body of a 2xx response, or the server message otherwise.
async fn expect_ok(res: Response) -> anyhow::Result<Value> {
    let status = res.status();
    if status.is_success() {
        return res.json::<Value>().await.context("failed to get response, aborting");
    }
    let message = res
        .json::<ErrorBody>()
        .await
        .map(|body| body.mensaje)
        .unwrap_or_else(|_| "no details".to_string());
    match status {
        StatusCode::UNAUTHORIZED => bail!("not logged in or session expired: {message}"),
        StatusCode::FORBIDDEN => bail!("your role cannot do this: {message}"),
        unexpected => bail!("got unexpected status code {unexpected}: {message}"),
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Cli::parse();
    let api = Api {
        client: Client::new(),
        host: args.host,
        token: args.token,
    };

    match args.command {
        Commands::Login { identificador, password } => {
            let body = expect_ok(
                api.post("auth/login", json!({"identificador": identificador, "password": password}))
                    .send()
                    .await?,
            )
            .await?;
            println!("logged in as {} ({})", body["usuario"]["nombre"], body["usuario"]["rol"]);
            println!("export COMANDA_TOKEN={}", body["token"].as_str().unwrap_or_default());
        }
        Commands::Orders(orders) => match orders.command {
            OrderCmds::List { all } => {
                let path = if all { "pedidos?incluir_cancelados=true" } else { "pedidos" };
                let body = expect_ok(api.get(path).send().await?).await?;
                for order in body.as_array().into_iter().flatten() {
                    println!(
                        "#{} mesa={} estado={} lineas={}",
                        order["id"],
                        order["mesa_id"],
                        order["estado"],
                        order["detalle_pedido"].as_array().map_or(0, Vec::len)
                    );
                }
            }
            OrderCmds::Advance { id, estado } => {
                let body = expect_ok(api.put(&format!("pedidos/{id}"), json!({"estado": estado})).send().await?).await?;
                println!("order {} is now {}", id, body["pedido"]["estado"]);
            }
            OrderCmds::Create { mesa, items } => {
                let platillos: Vec<Value> = items
                    .iter()
                    .map(|(id, qty)| json!({"item_menu_id": id, "cantidad": qty}))
                    .collect();
                let body = expect_ok(
                    api.post("pedidos", json!({"mesa_id": mesa, "platillos": platillos}))
                        .send()
                        .await?,
                )
                .await?;
                println!("order {} created for table id {}", body["pedido"]["id"], mesa);
            }
        },
        Commands::Bill(bill) => match bill.command {
            BillCmds::Create { orders, tip, percent, pay } => {
                let mut request = json!({"pedido_ids": orders});
                if let Some(tip) = tip {
                    request["propina"] = json!({"valor": tip, "es_porcentaje": percent});
                }
                if let Some(method) = pay {
                    request["metodo_pago"] = json!(method);
                    request["pagar"] = json!(true);
                }
                let body = expect_ok(api.post("cuentas", request).send().await?).await?;
                for cuenta in body["cuentas"].as_array().into_iter().flatten() {
                    println!(
                        "bill {} order={} subtotal={} propina={} total={} estado={}",
                        cuenta["id"], cuenta["pedido_id"], cuenta["subtotal"], cuenta["propina"], cuenta["total"], cuenta["estado"]
                    );
                }
            }
            BillCmds::Pay { id, method } => {
                let body = expect_ok(
                    api.put(&format!("cuentas/{id}"), json!({"estado": "pagada", "metodo_pago": method}))
                        .send()
                        .await?,
                )
                .await?;
                println!("bill {} paid, total={}", id, body["cuenta"]["total"]);
            }
        },
        Commands::Report { fecha } => {
            let res = api
                .request(api.client.get(api.url("reportes")).query(&[("fecha", fecha.as_str())]))
                .send()
                .await?;
            let body = expect_ok(res).await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    };
    Ok(())
}
